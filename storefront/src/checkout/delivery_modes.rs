//! Delivery modes of the checkout.
//!
//! Holds the modes the backend offers for the cart and the code the user
//! picked. The picked code may be set before the modes are loaded; the
//! selected mode resolves once both are present.

use crate::environment::{backend_effect, StorefrontEnvironment};
use crate::occ::models::DeliveryMode;
use crate::occ::{BackendOperation, OccError};
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use storefront_state_core::effect::{Effect, EffectId};
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::{Slice, Snapshot};
use storefront_state_core::{smallvec, SmallVec};
use storefront_state_macros::Action;

/// Effect id of the delivery modes load
pub const DELIVERY_MODES_LOAD: EffectId = EffectId::new("delivery-modes-load");

/// Delivery modes state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryModesState {
    /// Modes offered for the cart
    pub supported: Vec<DeliveryMode>,
    /// Code of the picked mode
    pub selected: Option<String>,
}

static INITIAL: LazyLock<Arc<DeliveryModesState>> =
    LazyLock::new(|| Arc::new(DeliveryModesState::default()));

impl Slice for DeliveryModesState {
    fn initial() -> Arc<Self> {
        Arc::clone(&INITIAL)
    }
}

/// Actions of the delivery modes slice
#[derive(Action, Clone, Debug, PartialEq)]
pub enum DeliveryModesAction {
    /// Load the modes offered for a cart
    #[start]
    LoadSupportedDeliveryModes {
        /// Owner of the cart
        user_id: String,
        /// Cart code
        cart_id: String,
    },

    /// Modes arrived
    #[success]
    LoadSupportedDeliveryModesSuccess(Vec<DeliveryMode>),

    /// Loading failed
    #[fail]
    LoadSupportedDeliveryModesFail(OccError),

    /// Pick a mode by code
    SetDeliveryMode(String),

    /// Forget everything about the checkout
    #[reset]
    ClearCheckoutData,
}

/// Reducer for the delivery modes slice
#[derive(Clone, Debug, Default)]
pub struct DeliveryModesReducer;

impl Reducer for DeliveryModesReducer {
    type State = Snapshot<DeliveryModesState>;
    type Action = DeliveryModesAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            DeliveryModesAction::LoadSupportedDeliveryModes { user_id, cart_id } => {
                let effect = backend_effect! {
                    env: env,
                    operation: BackendOperation::LoadDeliveryModes,
                    call: |backend| backend.load_supported_delivery_modes(&user_id, &cart_id),
                    on_success: |modes| DeliveryModesAction::LoadSupportedDeliveryModesSuccess(modes),
                    on_error: |error| DeliveryModesAction::LoadSupportedDeliveryModesFail(error)
                };
                smallvec![effect.cancellable(DELIVERY_MODES_LOAD)]
            },
            DeliveryModesAction::LoadSupportedDeliveryModesSuccess(supported) => {
                state.update(|prev| DeliveryModesState {
                    supported,
                    selected: prev.selected.clone(),
                });
                smallvec![]
            },
            DeliveryModesAction::LoadSupportedDeliveryModesFail(_) => {
                state.reset();
                smallvec![]
            },
            DeliveryModesAction::SetDeliveryMode(code) => {
                if state.selected.as_deref() != Some(code.as_str()) {
                    state.update(|prev| DeliveryModesState {
                        supported: prev.supported.clone(),
                        selected: Some(code),
                    });
                }
                smallvec![]
            },
            DeliveryModesAction::ClearCheckoutData => {
                state.reset();
                smallvec![Effect::Cancel(DELIVERY_MODES_LOAD)]
            },
        }
    }
}

/// Modes offered for the cart
#[must_use]
pub fn supported_delivery_modes(state: &DeliveryModesState) -> &[DeliveryMode] {
    &state.supported
}

/// The picked mode, once it is among the supported ones
#[must_use]
pub fn selected_delivery_mode(state: &DeliveryModesState) -> Option<&DeliveryMode> {
    let code = state.selected.as_deref()?;
    state.supported.iter().find(|mode| mode.code == code)
}
