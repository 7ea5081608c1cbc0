//! Product listing slices.

pub mod facet_navigation;
pub mod search;

pub use facet_navigation::{FacetNavigationAction, FacetNavigationReducer, FacetNavigationState};
pub use search::{ProductSearchAction, ProductSearchReducer, ProductSearchState};
