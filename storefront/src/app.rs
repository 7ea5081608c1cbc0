//! Application composition.
//!
//! The application state is the keyed union of the storefront slices. The
//! application reducer is built from an explicit registration list: each
//! slice reducer is scoped to its field of [`AppState`] and its variant of
//! [`AppAction`], followed by [`FacetFilterRouting`], which turns facet
//! selections into searches.

use crate::cart::{CartAction, CartReducer, CartState};
use crate::checkout::delivery_modes::{DeliveryModesAction, DeliveryModesReducer, DeliveryModesState};
use crate::environment::StorefrontEnvironment;
use crate::product::{
    FacetNavigationAction, FacetNavigationReducer, FacetNavigationState, ProductSearchAction,
    ProductSearchReducer, ProductSearchState,
};
use crate::user::{
    DeliveryCountriesAction, DeliveryCountriesReducer, DeliveryCountriesState, UserAddressesAction,
    UserAddressesReducer, UserAddressesState,
};
use serde::Serialize;
use storefront_state_core::action::{Action, ActionKind};
use storefront_state_core::composition::{combine_reducers, scope_reducer, BoxedReducer, CombinedReducer};
use storefront_state_core::effect::Effect;
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::Snapshot;
use storefront_state_core::{emit, smallvec, SmallVec};
use storefront_state_runtime::{Store, StoreConfig};

// ============================================================================
// State and actions
// ============================================================================

/// The storefront application state, one snapshot per slice
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Product search
    pub search: Snapshot<ProductSearchState>,
    /// Facet navigation of the product list
    pub facets: Snapshot<FacetNavigationState>,
    /// User addresses
    pub addresses: Snapshot<UserAddressesState>,
    /// Delivery countries
    pub countries: Snapshot<DeliveryCountriesState>,
    /// Active cart
    pub cart: Snapshot<CartState>,
    /// Checkout delivery modes
    pub delivery_modes: Snapshot<DeliveryModesState>,
}

/// An action of one slice
#[derive(Clone, Debug, PartialEq)]
pub enum AppAction {
    /// Product search
    Search(ProductSearchAction),
    /// Facet navigation
    Facets(FacetNavigationAction),
    /// User addresses
    Addresses(UserAddressesAction),
    /// Delivery countries
    Countries(DeliveryCountriesAction),
    /// Cart
    Cart(CartAction),
    /// Checkout delivery modes
    DeliveryModes(DeliveryModesAction),
}

impl Action for AppAction {
    fn kind(&self) -> &'static str {
        match self {
            Self::Search(action) => action.kind(),
            Self::Facets(action) => action.kind(),
            Self::Addresses(action) => action.kind(),
            Self::Countries(action) => action.kind(),
            Self::Cart(action) => action.kind(),
            Self::DeliveryModes(action) => action.kind(),
        }
    }

    fn tag_class(&self) -> ActionKind {
        match self {
            Self::Search(action) => action.tag_class(),
            Self::Facets(action) => action.tag_class(),
            Self::Addresses(action) => action.tag_class(),
            Self::Countries(action) => action.tag_class(),
            Self::Cart(action) => action.tag_class(),
            Self::DeliveryModes(action) => action.tag_class(),
        }
    }
}

macro_rules! from_slice_action {
    ($($action:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$action> for AppAction {
                fn from(action: $action) -> Self {
                    Self::$variant(action)
                }
            }
        )*
    };
}

from_slice_action! {
    ProductSearchAction => Search,
    FacetNavigationAction => Facets,
    UserAddressesAction => Addresses,
    DeliveryCountriesAction => Countries,
    CartAction => Cart,
    DeliveryModesAction => DeliveryModes,
}

// ============================================================================
// Reducer
// ============================================================================

/// The application reducer
pub type AppReducer = CombinedReducer<AppState, AppAction, StorefrontEnvironment>;

/// The application store
pub type AppStore = Store<AppState, AppAction, StorefrontEnvironment, AppReducer>;

/// Scope a slice reducer to `AppState::$field` and `AppAction::$variant`.
macro_rules! scoped {
    ($reducer:expr, $field:ident: $slice:ty, $variant:ident($action:ty)) => {{
        fn get_state(state: &AppState) -> &Snapshot<$slice> {
            &state.$field
        }

        fn set_state(state: &mut AppState, slice: Snapshot<$slice>) {
            state.$field = slice;
        }

        fn extract_action(action: AppAction) -> Option<$action> {
            match action {
                AppAction::$variant(action) => Some(action),
                _ => None,
            }
        }

        let reducer: BoxedReducer<AppState, AppAction, StorefrontEnvironment> = Box::new(scope_reducer(
            $reducer,
            get_state,
            set_state,
            extract_action,
            AppAction::$variant,
        ));
        reducer
    }};
}

/// Build the application reducer from the slice registration list.
#[must_use]
pub fn app_reducer() -> AppReducer {
    combine_reducers(vec![
        Box::new(FacetFilterRouting),
        scoped!(ProductSearchReducer::new(), search: ProductSearchState, Search(ProductSearchAction)),
        scoped!(FacetNavigationReducer, facets: FacetNavigationState, Facets(FacetNavigationAction)),
        scoped!(UserAddressesReducer, addresses: UserAddressesState, Addresses(UserAddressesAction)),
        scoped!(
            DeliveryCountriesReducer,
            countries: DeliveryCountriesState,
            Countries(DeliveryCountriesAction)
        ),
        scoped!(CartReducer, cart: CartState, Cart(CartAction)),
        scoped!(
            DeliveryModesReducer,
            delivery_modes: DeliveryModesState,
            DeliveryModes(DeliveryModesAction)
        ),
    ])
}

/// Routes facet navigation output to the product search.
///
/// - `Filter(query)` starts a primary search for `query`.
/// - A primary search success that was applied re-initialises the facet
///   navigation with the new facets.
///
/// Registered before the slices, so it sees the search slice as it was when
/// the success arrived and can tell whether the slice will apply it.
#[derive(Clone, Debug, Default)]
pub struct FacetFilterRouting;

impl Reducer for FacetFilterRouting {
    type State = AppState;
    type Action = AppAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::Facets(FacetNavigationAction::Filter(query)) => {
                smallvec![emit!(AppAction::Search(ProductSearchAction::SearchProducts {
                    query,
                    auxiliary: false,
                }))]
            },
            AppAction::Search(ProductSearchAction::SearchProductsSuccess {
                request,
                results,
                auxiliary: false,
            }) if state.search.loading && state.search.is_tracked(request, false) => {
                smallvec![emit!(AppAction::Facets(FacetNavigationAction::Init(results.facets)))]
            },
            _ => smallvec![],
        }
    }
}

/// Build the store with the application reducer.
#[must_use]
pub fn build_store(environment: StorefrontEnvironment, config: StoreConfig) -> AppStore {
    Store::with_config(AppState::default(), app_reducer(), environment, config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::occ::models::{Address, Facet, ProductList};
    use crate::test_support::test_environment;
    use storefront_state_core::request::RequestId;

    #[test]
    fn registration_list_covers_every_slice() {
        assert_eq!(app_reducer().len(), 7);
    }

    #[test]
    fn actions_only_touch_their_slice() {
        let env = test_environment();
        let reducer = app_reducer();
        let mut state = AppState::default();
        let before = state.clone();

        reducer.reduce(
            &mut state,
            AppAction::Addresses(UserAddressesAction::LoadUserAddressesSuccess(vec![Address::default()])),
            &env,
        );

        assert_eq!(state.addresses.list.len(), 1);
        assert!(Snapshot::ptr_eq(&state.search, &before.search));
        assert!(Snapshot::ptr_eq(&state.cart, &before.cart));
        assert!(Snapshot::ptr_eq(&state.delivery_modes, &before.delivery_modes));
        assert!(Snapshot::ptr_eq(&state.countries, &before.countries));
        assert!(Snapshot::ptr_eq(&state.facets, &before.facets));
    }

    #[test]
    fn app_action_delegates_tags() {
        let action: AppAction = CartAction::LoadCartFail(crate::occ::OccError::Unauthorized).into();
        assert_eq!(action.kind(), "LOAD_CART_FAIL");
        assert_eq!(action.tag_class(), ActionKind::Fail);
    }

    #[tokio::test]
    async fn facet_filter_becomes_a_search() {
        let env = test_environment();
        let mut state = AppState::default();
        let mut effects = app_reducer().reduce(
            &mut state,
            AppAction::Facets(FacetNavigationAction::Filter("camera:relevance:category:lenses".into())),
            &env,
        );

        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("a filter routes to a search");
        };
        assert_eq!(
            fut.await,
            Some(AppAction::Search(ProductSearchAction::SearchProducts {
                query: "camera:relevance:category:lenses".into(),
                auxiliary: false,
            }))
        );
    }

    #[tokio::test]
    async fn applied_search_reinitialises_facets() {
        let env = test_environment();
        let reducer = app_reducer();
        let mut state = AppState::default();
        reducer.reduce(
            &mut state,
            AppAction::Search(ProductSearchAction::SearchProducts {
                query: "camera".into(),
                auxiliary: false,
            }),
            &env,
        );

        let results = ProductList {
            facets: vec![Facet {
                name: "Category".into(),
                ..Facet::default()
            }],
            ..ProductList::default()
        };
        let mut effects = reducer.reduce(
            &mut state,
            AppAction::Search(ProductSearchAction::SearchProductsSuccess {
                request: RequestId::new(1),
                results: results.clone(),
                auxiliary: false,
            }),
            &env,
        );

        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("an applied search initialises the facets");
        };
        assert_eq!(
            fut.await,
            Some(AppAction::Facets(FacetNavigationAction::Init(results.facets)))
        );

        // A stale success is dropped and routes nothing
        let effects = reducer.reduce(
            &mut state,
            AppAction::Search(ProductSearchAction::SearchProductsSuccess {
                request: RequestId::new(9),
                results: ProductList::default(),
                auxiliary: false,
            }),
            &env,
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn stale_success_with_equal_results_keeps_expanded_facets() {
        let env = test_environment();
        let reducer = app_reducer();
        let mut state = AppState::default();
        reducer.reduce(
            &mut state,
            AppAction::Search(ProductSearchAction::SearchProducts {
                query: "camera".into(),
                auxiliary: false,
            }),
            &env,
        );
        reducer.reduce(
            &mut state,
            AppAction::Search(ProductSearchAction::SearchProductsSuccess {
                request: RequestId::new(1),
                results: ProductList::default(),
                auxiliary: false,
            }),
            &env,
        );
        reducer.reduce(
            &mut state,
            AppAction::Facets(FacetNavigationAction::ShowMore("Category".into())),
            &env,
        );
        let facets = state.facets.clone();
        let search = state.search.clone();

        // Same payload as the committed results, but for an untracked request
        let effects = reducer.reduce(
            &mut state,
            AppAction::Search(ProductSearchAction::SearchProductsSuccess {
                request: RequestId::new(1),
                results: ProductList::default(),
                auxiliary: false,
            }),
            &env,
        );

        assert!(effects.is_empty());
        assert!(Snapshot::ptr_eq(&state.search, &search));
        assert!(Snapshot::ptr_eq(&state.facets, &facets));
    }
}
