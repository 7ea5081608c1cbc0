//! Delivery countries slice, keyed by isocode.

use crate::environment::{backend_effect, StorefrontEnvironment};
use crate::occ::models::Country;
use crate::occ::{BackendOperation, OccError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use storefront_state_core::effect::Effect;
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::{Slice, Snapshot};
use storefront_state_core::{smallvec, SmallVec};
use storefront_state_macros::Action;

/// Countries the store delivers to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryCountriesState {
    /// Countries by isocode
    pub entities: BTreeMap<String, Country>,
}

impl DeliveryCountriesState {
    /// Index countries by isocode; a later duplicate wins
    #[must_use]
    pub fn from_countries(countries: Vec<Country>) -> Self {
        Self {
            entities: countries
                .into_iter()
                .map(|country| (country.isocode.clone(), country))
                .collect(),
        }
    }
}

static INITIAL: LazyLock<Arc<DeliveryCountriesState>> =
    LazyLock::new(|| Arc::new(DeliveryCountriesState::default()));

impl Slice for DeliveryCountriesState {
    fn initial() -> Arc<Self> {
        Arc::clone(&INITIAL)
    }
}

/// Actions of the delivery countries slice
#[derive(Action, Clone, Debug, PartialEq)]
pub enum DeliveryCountriesAction {
    /// Load the delivery countries
    #[start]
    LoadDeliveryCountries,

    /// Countries arrived
    #[success]
    LoadDeliveryCountriesSuccess(Vec<Country>),

    /// Loading failed
    #[fail]
    LoadDeliveryCountriesFail(OccError),
}

/// Reducer for the delivery countries slice
#[derive(Clone, Debug, Default)]
pub struct DeliveryCountriesReducer;

impl Reducer for DeliveryCountriesReducer {
    type State = Snapshot<DeliveryCountriesState>;
    type Action = DeliveryCountriesAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            DeliveryCountriesAction::LoadDeliveryCountries => smallvec![backend_effect! {
                env: env,
                operation: BackendOperation::LoadDeliveryCountries,
                call: |backend| backend.load_delivery_countries(),
                on_success: |countries| DeliveryCountriesAction::LoadDeliveryCountriesSuccess(countries),
                on_error: |error| DeliveryCountriesAction::LoadDeliveryCountriesFail(error)
            }],
            DeliveryCountriesAction::LoadDeliveryCountriesSuccess(countries) => {
                state.replace(DeliveryCountriesState::from_countries(countries));
                smallvec![]
            },
            DeliveryCountriesAction::LoadDeliveryCountriesFail(_) => {
                state.reset();
                smallvec![]
            },
        }
    }
}

/// The country with `isocode`, if loaded
#[must_use]
pub fn country<'a>(state: &'a DeliveryCountriesState, isocode: &str) -> Option<&'a Country> {
    state.entities.get(isocode)
}

/// All loaded countries, ordered by isocode
pub fn all_countries(state: &DeliveryCountriesState) -> impl Iterator<Item = &Country> {
    state.entities.values()
}
