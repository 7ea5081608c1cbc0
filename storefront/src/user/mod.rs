//! User slices.

pub mod addresses;
pub mod countries;

pub use addresses::{UserAddressesAction, UserAddressesReducer, UserAddressesState};
pub use countries::{DeliveryCountriesAction, DeliveryCountriesReducer, DeliveryCountriesState};
