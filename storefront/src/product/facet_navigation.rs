//! Facet navigation of a product list.
//!
//! Tracks which facets are expanded. Every facet starts collapsed and shows
//! at most [`MIN_PER_FACET`] values. Selecting a value does not touch this
//! slice: it emits [`FacetNavigationAction::Filter`] with the value's query,
//! which the application routes to a new search.

use crate::occ::models::{Facet, FacetValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use storefront_state_core::effect::Effect;
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::{Slice, Snapshot};
use storefront_state_core::{emit, smallvec, SmallVec};
use storefront_state_macros::Action;

/// Values shown per collapsed facet
pub const MIN_PER_FACET: usize = 6;

/// Show-all flag per facet name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetNavigationState {
    /// `true` when the facet shows all of its values
    pub show_all: BTreeMap<String, bool>,
}

impl FacetNavigationState {
    /// Whether `facet` shows all of its values
    #[must_use]
    pub fn is_expanded(&self, facet: &str) -> bool {
        self.show_all.get(facet).copied().unwrap_or(false)
    }

    /// The values of `facet` to display
    #[must_use]
    pub fn visible_values<'a>(&self, facet: &'a Facet, min_per_facet: usize) -> &'a [FacetValue] {
        if self.is_expanded(&facet.name) {
            &facet.values
        } else {
            &facet.values[..facet.values.len().min(min_per_facet)]
        }
    }

    /// Whether `facet` has values hidden while collapsed
    #[must_use]
    pub fn has_more(facet: &Facet, min_per_facet: usize) -> bool {
        facet.values.len() > min_per_facet
    }
}

static INITIAL: LazyLock<Arc<FacetNavigationState>> =
    LazyLock::new(|| Arc::new(FacetNavigationState::default()));

impl Slice for FacetNavigationState {
    fn initial() -> Arc<Self> {
        Arc::clone(&INITIAL)
    }
}

/// Actions of the facet navigation
#[derive(Action, Clone, Debug, PartialEq)]
pub enum FacetNavigationAction {
    /// A new result is displayed: collapse all of its facets
    Init(Vec<Facet>),
    /// Expand a facet
    ShowMore(String),
    /// Collapse a facet
    ShowLess(String),
    /// A facet value was clicked
    ToggleValue(String),
    /// Search with this query (emitted by `ToggleValue`)
    Filter(String),
}

/// Reducer for the facet navigation
#[derive(Clone, Debug, Default)]
pub struct FacetNavigationReducer;

impl FacetNavigationReducer {
    fn set(state: &mut Snapshot<FacetNavigationState>, facet: String, show_all: bool) {
        if state.show_all.get(&facet) == Some(&show_all) {
            return;
        }
        state.update(|prev| {
            let mut next = prev.clone();
            next.show_all.insert(facet, show_all);
            next
        });
    }
}

impl Reducer for FacetNavigationReducer {
    type State = Snapshot<FacetNavigationState>;
    type Action = FacetNavigationAction;
    type Environment = crate::environment::StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FacetNavigationAction::Init(facets) => {
                let show_all: BTreeMap<String, bool> =
                    facets.into_iter().map(|facet| (facet.name, false)).collect();
                if show_all != state.show_all {
                    state.replace(FacetNavigationState { show_all });
                }
                smallvec![]
            },
            FacetNavigationAction::ShowMore(facet) => {
                Self::set(state, facet, true);
                smallvec![]
            },
            FacetNavigationAction::ShowLess(facet) => {
                Self::set(state, facet, false);
                smallvec![]
            },
            FacetNavigationAction::ToggleValue(query) => {
                smallvec![emit!(FacetNavigationAction::Filter(query))]
            },
            FacetNavigationAction::Filter(_) => smallvec![],
        }
    }
}
