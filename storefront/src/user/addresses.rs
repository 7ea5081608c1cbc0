//! User addresses slice.

use crate::environment::{backend_effect, StorefrontEnvironment};
use crate::occ::models::Address;
use crate::occ::{BackendOperation, OccError};
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use storefront_state_core::effect::Effect;
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::{Slice, Snapshot};
use storefront_state_core::{smallvec, SmallVec};
use storefront_state_macros::Action;

/// Saved addresses of the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserAddressesState {
    /// Addresses in backend order
    pub list: Vec<Address>,
}

impl UserAddressesState {
    /// Wrap a list of addresses
    #[must_use]
    pub const fn new(list: Vec<Address>) -> Self {
        Self { list }
    }
}

static INITIAL: LazyLock<Arc<UserAddressesState>> =
    LazyLock::new(|| Arc::new(UserAddressesState::default()));

impl Slice for UserAddressesState {
    fn initial() -> Arc<Self> {
        Arc::clone(&INITIAL)
    }
}

/// Actions of the user addresses slice
#[derive(Action, Clone, Debug, PartialEq)]
pub enum UserAddressesAction {
    /// Load the addresses of a user
    #[start]
    LoadUserAddresses {
        /// User id (`current` for the logged-in user)
        user_id: String,
    },

    /// Addresses arrived
    #[success]
    LoadUserAddressesSuccess(Vec<Address>),

    /// Loading failed
    #[fail]
    LoadUserAddressesFail(OccError),
}

/// Reducer for the user addresses slice
#[derive(Clone, Debug, Default)]
pub struct UserAddressesReducer;

impl Reducer for UserAddressesReducer {
    type State = Snapshot<UserAddressesState>;
    type Action = UserAddressesAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAddressesAction::LoadUserAddresses { user_id } => {
                smallvec![backend_effect! {
                    env: env,
                    operation: BackendOperation::LoadAddresses,
                    call: |backend| backend.load_addresses(&user_id),
                    on_success: |addresses| UserAddressesAction::LoadUserAddressesSuccess(addresses),
                    on_error: |error| UserAddressesAction::LoadUserAddressesFail(error)
                }]
            },
            UserAddressesAction::LoadUserAddressesSuccess(addresses) => {
                state.replace(UserAddressesState::new(addresses));
                smallvec![]
            },
            UserAddressesAction::LoadUserAddressesFail(_) => {
                state.reset();
                smallvec![]
            },
        }
    }
}

/// Saved addresses
#[must_use]
pub fn addresses(state: &UserAddressesState) -> &[Address] {
    &state.list
}

/// The default address, if one is flagged
#[must_use]
pub fn default_address(state: &UserAddressesState) -> Option<&Address> {
    state.list.iter().find(|a| a.default_address)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::test_support::test_environment;
    use storefront_state_core::action::{Action, ActionKind};
    use storefront_state_core::slice::reduce_slice;
    use storefront_state_testing::{assertions, ReducerTest};

    fn address(id: &str) -> Address {
        Address {
            id: Some(id.to_string()),
            ..Address::default()
        }
    }

    #[test]
    fn success_populates_the_list() {
        let addresses = vec![address("address1"), address("address2")];
        let expected = addresses.clone();
        ReducerTest::new(UserAddressesReducer)
            .with_env(test_environment())
            .given_state(Snapshot::initial())
            .when_action(UserAddressesAction::LoadUserAddressesSuccess(addresses))
            .then_state(move |state| assert_eq!(state.list, expected))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn fail_returns_initial_state() {
        let env = test_environment();
        let (state, _) = reduce_slice(
            &UserAddressesReducer,
            Some(Snapshot::new(UserAddressesState::new(vec![address("address1")]))),
            UserAddressesAction::LoadUserAddressesFail(OccError::Unauthorized),
            &env,
        );
        assert!(state.is_initial());
        assert_eq!(*state, UserAddressesState::default());
    }

    #[test]
    fn load_leaves_state_and_returns_backend_call() {
        let action = UserAddressesAction::LoadUserAddresses {
            user_id: "current".into(),
        };
        assert_eq!(action.kind(), "LOAD_USER_ADDRESSES");
        assert_eq!(action.tag_class(), ActionKind::Start);

        ReducerTest::new(UserAddressesReducer)
            .with_env(test_environment())
            .given_state(Snapshot::initial())
            .when_action(action)
            .then_unchanged()
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn default_address_selector() {
        let mut home = address("home");
        home.default_address = true;
        let state = UserAddressesState::new(vec![address("work"), home]);
        assert_eq!(default_address(&state).unwrap().id.as_deref(), Some("home"));
        assert_eq!(addresses(&state).len(), 2);
    }

    #[tokio::test]
    async fn load_effect_reports_unknown_user() {
        let env = test_environment();
        let mut state = Snapshot::<UserAddressesState>::initial();
        let mut effects = UserAddressesReducer.reduce(
            &mut state,
            UserAddressesAction::LoadUserAddresses {
                user_id: "nobody".into(),
            },
            &env,
        );
        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("loading returns a backend call");
        };
        assert!(matches!(
            fut.await.unwrap(),
            UserAddressesAction::LoadUserAddressesFail(OccError::NotFound(_))
        ));
    }
}
