//! Active cart slice.

use crate::environment::{backend_effect, StorefrontEnvironment};
use crate::occ::models::{Cart, OrderEntry};
use crate::occ::{BackendOperation, OccError};
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use storefront_state_core::effect::{Effect, EffectId};
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::{Slice, Snapshot};
use storefront_state_core::{smallvec, SmallVec};
use storefront_state_macros::Action;

/// Effect id of the cart load; a newer load replaces a running one
pub const CART_LOAD: EffectId = EffectId::new("cart-load");

/// The active cart
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartState {
    /// The cart, empty until loaded
    pub active: Cart,
    /// Whether a load is in flight
    pub loading: bool,
}

static INITIAL: LazyLock<Arc<CartState>> = LazyLock::new(|| Arc::new(CartState::default()));

impl Slice for CartState {
    fn initial() -> Arc<Self> {
        Arc::clone(&INITIAL)
    }
}

/// Actions of the cart slice
#[derive(Action, Clone, Debug, PartialEq)]
pub enum CartAction {
    /// Load a cart
    #[start]
    LoadCart {
        /// Owner of the cart
        user_id: String,
        /// Cart code, or `current`
        cart_id: String,
    },

    /// The cart arrived
    #[success]
    LoadCartSuccess(Cart),

    /// Loading failed
    #[fail]
    LoadCartFail(OccError),
}

/// Reducer for the cart slice
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl Reducer for CartReducer {
    type State = Snapshot<CartState>;
    type Action = CartAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::LoadCart { user_id, cart_id } => {
                if !state.loading {
                    state.update(|prev| CartState {
                        loading: true,
                        ..prev.clone()
                    });
                }
                let effect = backend_effect! {
                    env: env,
                    operation: BackendOperation::LoadCart,
                    call: |backend| backend.load_cart(&user_id, &cart_id),
                    on_success: |cart| CartAction::LoadCartSuccess(cart),
                    on_error: |error| CartAction::LoadCartFail(error)
                };
                smallvec![effect.cancellable(CART_LOAD)]
            },
            CartAction::LoadCartSuccess(cart) => {
                if !state.loading {
                    tracing::debug!("Dropped cart response without a pending load");
                    return smallvec![];
                }
                state.replace(CartState {
                    active: cart,
                    loading: false,
                });
                smallvec![]
            },
            CartAction::LoadCartFail(_) => {
                state.reset();
                smallvec![]
            },
        }
    }
}

/// Summary shown by the mini cart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniCartSummary {
    /// Units in the cart
    pub total_items: u32,
    /// Formatted subtotal
    pub sub_total: Option<String>,
}

/// The active cart
#[must_use]
pub fn active_cart(state: &CartState) -> &Cart {
    &state.active
}

/// Lines of the active cart
#[must_use]
pub fn cart_entries(state: &CartState) -> &[OrderEntry] {
    &state.active.entries
}

/// Whether a cart load is in flight
#[must_use]
pub const fn cart_loading(state: &CartState) -> bool {
    state.loading
}

/// Mini cart summary of the active cart
#[must_use]
pub fn mini_cart_summary(state: &CartState) -> MiniCartSummary {
    MiniCartSummary {
        total_items: state.active.total_items,
        sub_total: state
            .active
            .sub_total
            .as_ref()
            .and_then(|price| price.formatted_value.clone()),
    }
}
