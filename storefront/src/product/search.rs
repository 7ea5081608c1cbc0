//! Product search slice.
//!
//! Holds the primary search results, the auxiliary results (a second
//! search running alongside the primary one, e.g. for a carousel) and the
//! term suggestions of the search box.
//!
//! Each search is tagged with a fresh [`RequestId`]. A completion or failure
//! is applied only when it carries the id tracked for its channel, and a
//! primary success only while the slice is loading; anything else is a stale
//! response and is dropped. A primary success clears `loading`; an auxiliary
//! success leaves it set only while a primary search is still tracked.

use crate::environment::{backend_effect, StorefrontEnvironment};
use crate::occ::models::{ProductList, Suggestion};
use crate::occ::{BackendOperation, OccError, SearchQuery};
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use storefront_state_core::effect::{Effect, EffectId};
use storefront_state_core::reducer::Reducer;
use storefront_state_core::request::RequestId;
use storefront_state_core::slice::{Slice, Snapshot};
use storefront_state_core::{smallvec, SmallVec};
use storefront_state_macros::Action;

/// Effect id of the primary search
pub const PRIMARY_SEARCH: EffectId = EffectId::new("product-search");

/// Effect id of the auxiliary search
pub const AUXILIARY_SEARCH: EffectId = EffectId::new("product-search-aux");

/// Effect id of the suggestions lookup
pub const SUGGESTIONS: EffectId = EffectId::new("product-suggestions");

// ============================================================================
// State
// ============================================================================

/// Request ids of the searches in flight, per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    /// Primary channel
    pub primary: Option<RequestId>,
    /// Auxiliary channel
    pub auxiliary: Option<RequestId>,
}

/// Product search state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchState {
    /// Primary search results
    pub results: ProductList,
    /// Suggestions for the last term
    pub suggestions: Vec<Suggestion>,
    /// Auxiliary search results
    pub aux_results: ProductList,
    /// Whether a search is in flight
    pub loading: bool,
    /// Tracked request ids
    #[serde(skip)]
    pub in_flight: InFlight,
}

impl ProductSearchState {
    /// The tracked request of a channel
    #[must_use]
    pub const fn in_flight(&self, auxiliary: bool) -> Option<RequestId> {
        if auxiliary {
            self.in_flight.auxiliary
        } else {
            self.in_flight.primary
        }
    }

    /// Whether `request` is the one tracked for its channel
    #[must_use]
    pub fn is_tracked(&self, request: RequestId, auxiliary: bool) -> bool {
        self.in_flight(auxiliary) == Some(request)
    }
}

static INITIAL: LazyLock<Arc<ProductSearchState>> =
    LazyLock::new(|| Arc::new(ProductSearchState::default()));

impl Slice for ProductSearchState {
    fn initial() -> Arc<Self> {
        Arc::clone(&INITIAL)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions of the product search slice
#[derive(Action, Clone, Debug, PartialEq)]
pub enum ProductSearchAction {
    /// Start a search
    #[start]
    SearchProducts {
        /// Query in storefront syntax (`text:sort:key:value`)
        query: String,
        /// Whether this is the auxiliary search
        auxiliary: bool,
    },

    /// A search completed
    #[success]
    SearchProductsSuccess {
        /// Request this responds to
        request: RequestId,
        /// Results
        results: ProductList,
        /// Whether this is the auxiliary search
        auxiliary: bool,
    },

    /// A search failed
    #[fail]
    SearchProductsFail {
        /// Request this responds to
        request: RequestId,
        /// Whether this is the auxiliary search
        auxiliary: bool,
        /// Backend error
        error: OccError,
    },

    /// Look up suggestions for a term
    ///
    /// Suggestions carry no loading flag.
    #[start]
    GetProductSuggestions {
        /// Term typed so far
        term: String,
    },

    /// Suggestions arrived
    #[success]
    GetProductSuggestionsSuccess(Vec<Suggestion>),

    /// Suggestions lookup failed
    #[fail]
    GetProductSuggestionsFail(OccError),

    /// Drop every result and cancel running lookups
    #[reset]
    CleanProductSearch,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the product search slice
#[derive(Clone, Debug, Default)]
pub struct ProductSearchReducer;

impl ProductSearchReducer {
    /// Creates a new `ProductSearchReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const fn channel(auxiliary: bool) -> EffectId {
        if auxiliary {
            AUXILIARY_SEARCH
        } else {
            PRIMARY_SEARCH
        }
    }

    fn search_effect(
        raw_query: &str,
        request: RequestId,
        auxiliary: bool,
        env: &StorefrontEnvironment,
    ) -> Effect<ProductSearchAction> {
        let query = SearchQuery::parse(raw_query, env.search.page_size);
        let effect = backend_effect! {
            env: env,
            operation: BackendOperation::SearchProducts,
            call: |backend| backend.search_products(&query),
            on_success: |results| ProductSearchAction::SearchProductsSuccess {
                request,
                results,
                auxiliary,
            },
            on_error: |error| ProductSearchAction::SearchProductsFail {
                request,
                auxiliary,
                error,
            }
        };
        effect.cancellable(Self::channel(auxiliary))
    }
}

impl Reducer for ProductSearchReducer {
    type State = Snapshot<ProductSearchState>;
    type Action = ProductSearchAction;
    type Environment = StorefrontEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ProductSearchAction::SearchProducts { query, auxiliary } => {
                let request = env.next_request_id();
                state.update(|prev| {
                    let mut next = prev.clone();
                    next.loading = true;
                    if auxiliary {
                        next.in_flight.auxiliary = Some(request);
                    } else {
                        next.in_flight.primary = Some(request);
                    }
                    next
                });
                tracing::debug!(%request, auxiliary, query = %query, "Searching products");
                smallvec![Self::search_effect(&query, request, auxiliary, env)]
            },

            ProductSearchAction::SearchProductsSuccess {
                request,
                results,
                auxiliary,
            } => {
                // The auxiliary channel may complete after the primary one cleared `loading`
                let pending = auxiliary || state.loading;
                if !pending || !state.is_tracked(request, auxiliary) {
                    tracing::debug!(%request, auxiliary, "Dropped stale search response");
                    return smallvec![];
                }
                state.update(|prev| {
                    let mut next = prev.clone();
                    if auxiliary {
                        next.aux_results = results;
                        next.in_flight.auxiliary = None;
                        next.loading = next.in_flight.primary.is_some();
                    } else {
                        next.results = results;
                        next.in_flight.primary = None;
                        next.loading = false;
                    }
                    next
                });
                smallvec![]
            },

            ProductSearchAction::SearchProductsFail { request, auxiliary, .. } => {
                if !state.is_tracked(request, auxiliary) {
                    tracing::debug!(%request, auxiliary, "Dropped stale search failure");
                    return smallvec![];
                }
                state.reset();
                smallvec![]
            },

            ProductSearchAction::GetProductSuggestions { term } => {
                let max = env.search.max_suggestions;
                let effect = backend_effect! {
                    env: env,
                    operation: BackendOperation::ProductSuggestions,
                    call: |backend| backend.product_suggestions(&term, max),
                    on_success: |suggestions| ProductSearchAction::GetProductSuggestionsSuccess(suggestions),
                    on_error: |error| ProductSearchAction::GetProductSuggestionsFail(error)
                };
                smallvec![effect.cancellable(SUGGESTIONS)]
            },

            ProductSearchAction::GetProductSuggestionsSuccess(suggestions) => {
                if state.suggestions != suggestions {
                    state.update(|prev| ProductSearchState {
                        suggestions,
                        ..prev.clone()
                    });
                }
                smallvec![]
            },

            ProductSearchAction::GetProductSuggestionsFail(_) => {
                state.reset();
                smallvec![]
            },

            ProductSearchAction::CleanProductSearch => {
                state.reset();
                smallvec![Effect::merge(vec![
                    Effect::Cancel(PRIMARY_SEARCH),
                    Effect::Cancel(AUXILIARY_SEARCH),
                    Effect::Cancel(SUGGESTIONS),
                ])]
            },
        }
    }
}

// ============================================================================
// Selectors
// ============================================================================

/// Primary search results
#[must_use]
pub fn search_results(state: &ProductSearchState) -> &ProductList {
    &state.results
}

/// Auxiliary search results
#[must_use]
pub fn aux_search_results(state: &ProductSearchState) -> &ProductList {
    &state.aux_results
}

/// Whether a search is in flight
#[must_use]
pub const fn search_results_loading(state: &ProductSearchState) -> bool {
    state.loading
}

/// Suggestions for the last term
#[must_use]
pub fn product_suggestions(state: &ProductSearchState) -> &[Suggestion] {
    &state.suggestions
}
