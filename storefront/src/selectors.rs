//! Selectors over the application state.
//!
//! Each returns an owned value so it can be passed straight to
//! [`Store::select`](storefront_state_runtime::Store::select).

use crate::app::AppState;
use crate::cart::{self, MiniCartSummary};
use crate::checkout::delivery_modes;
use crate::occ::models::{Address, Cart, Country, DeliveryMode, OrderEntry, ProductList, Suggestion};
use crate::product::search;
use crate::user::{addresses as user_addresses, countries};

/// Primary search results
#[must_use]
pub fn search_results(state: &AppState) -> ProductList {
    search::search_results(&state.search).clone()
}

/// Auxiliary search results
#[must_use]
pub fn aux_search_results(state: &AppState) -> ProductList {
    search::aux_search_results(&state.search).clone()
}

/// Whether a search is in flight
#[must_use]
pub fn search_results_loading(state: &AppState) -> bool {
    search::search_results_loading(&state.search)
}

/// Suggestions for the last term
#[must_use]
pub fn product_suggestions(state: &AppState) -> Vec<Suggestion> {
    search::product_suggestions(&state.search).to_vec()
}

/// Saved addresses of the user
#[must_use]
pub fn addresses(state: &AppState) -> Vec<Address> {
    user_addresses::addresses(&state.addresses).to_vec()
}

/// Selector for the delivery country with `isocode`
pub fn country(isocode: impl Into<String>) -> impl Fn(&AppState) -> Option<Country> + Send + Sync + 'static {
    let isocode = isocode.into();
    move |state: &AppState| countries::country(&state.countries, &isocode).cloned()
}

/// The active cart
#[must_use]
pub fn active_cart(state: &AppState) -> Cart {
    cart::active_cart(&state.cart).clone()
}

/// Entries of the active cart
#[must_use]
pub fn cart_entries(state: &AppState) -> Vec<OrderEntry> {
    cart::cart_entries(&state.cart).to_vec()
}

/// Mini cart summary
#[must_use]
pub fn mini_cart_summary(state: &AppState) -> MiniCartSummary {
    cart::mini_cart_summary(&state.cart)
}

/// The chosen delivery mode, once resolved
#[must_use]
pub fn selected_delivery_mode(state: &AppState) -> Option<DeliveryMode> {
    delivery_modes::selected_delivery_mode(&state.delivery_modes).cloned()
}
