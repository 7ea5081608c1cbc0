//! Checkout slices and the review step.

pub mod delivery_modes;
pub mod review;

pub use delivery_modes::{DeliveryModesAction, DeliveryModesReducer, DeliveryModesState};
pub use review::{Card, ReviewDetails, ReviewSubmit};
