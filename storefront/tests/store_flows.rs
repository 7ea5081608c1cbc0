//! Storefront flows through the store and the in-memory backend.
//!
//! Covers the start/success scenario, superseded searches, retries of
//! transient failures, facet selections and the checkout review.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use storefront::app::{app_reducer, build_store, AppAction, AppState, AppStore};
use storefront::cart::CartAction;
use storefront::checkout::delivery_modes::DeliveryModesAction;
use storefront::checkout::review::ReviewSubmit;
use storefront::environment::StorefrontEnvironment;
use storefront::occ::models::{Product, ProductList};
use storefront::occ::{BackendOperation, InMemoryBackend, OccError};
use storefront::product::{FacetNavigationAction, ProductSearchAction, ProductSearchState};
use storefront::selectors;
use storefront::user::UserAddressesAction;
use storefront_state_core::reducer::Reducer;
use storefront_state_core::slice::Snapshot;
use storefront_state_runtime::retry::RetryPolicy;
use storefront_state_runtime::StoreConfig;

// ============================================================================
// Helpers
// ============================================================================

const TIMEOUT: Duration = Duration::from_secs(2);

fn store_over(backend: Arc<InMemoryBackend>, retry: RetryPolicy) -> AppStore {
    let environment = StorefrontEnvironment::new(backend).with_retry(retry);
    build_store(environment, StoreConfig::default())
}

fn sample_store() -> AppStore {
    store_over(Arc::new(InMemoryBackend::sample().unwrap()), RetryPolicy::none())
}

fn search(query: &str) -> AppAction {
    ProductSearchAction::SearchProducts {
        query: query.to_string(),
        auxiliary: false,
    }
    .into()
}

fn codes(results: &ProductList) -> Vec<&str> {
    results.products.iter().map(|p| p.code.as_str()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn start_then_success_from_initial_state() {
    let env = StorefrontEnvironment::new(Arc::new(InMemoryBackend::sample().unwrap()));
    let reducer = app_reducer();
    let mut state = AppState::default();

    reducer.reduce(&mut state, search("camera"), &env);
    let request = state.search.in_flight(false).unwrap();

    let r1 = ProductList {
        products: vec![Product {
            code: "1934793".into(),
            ..Product::default()
        }],
        ..ProductList::default()
    };
    reducer.reduce(
        &mut state,
        ProductSearchAction::SearchProductsSuccess {
            request,
            results: r1.clone(),
            auxiliary: false,
        }
        .into(),
        &env,
    );

    assert_eq!(
        *state.search,
        ProductSearchState {
            results: r1,
            ..ProductSearchState::default()
        }
    );
    assert!(!state.search.loading);
    assert!(state.search.aux_results.is_empty());
    assert!(state.search.suggestions.is_empty());
}

#[tokio::test]
async fn search_populates_results_and_facets() {
    let store = sample_store();

    store.send(search("tripod")).await.unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    let state = store.snapshot();
    assert_eq!(codes(&state.search.results), vec!["2278102", "3555166"]);
    assert!(!state.search.loading);
    assert!(state.facets.show_all.contains_key("Category"));
    assert!(!state.facets.is_expanded("Category"));
    assert!(Snapshot::ptr_eq(&state.addresses, &Snapshot::initial()));

    store.shutdown(TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn newer_search_supersedes_a_slow_one() {
    let backend = InMemoryBackend::sample()
        .unwrap()
        .with_query_latency("lens", Duration::from_millis(300));
    let store = store_over(Arc::new(backend), RetryPolicy::none());

    store.send(search("lens")).await.unwrap();
    store.send(search("tripod")).await.unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    let results = store.state(|s| s.search.results.clone()).await;
    assert_eq!(results.free_text_search.as_deref(), Some("tripod"));
    assert_eq!(results.products.len(), 2);
    assert!(!store.state(|s| s.search.loading).await);
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let backend = Arc::new(InMemoryBackend::sample().unwrap());
    backend.fail_next(
        BackendOperation::LoadAddresses,
        OccError::Unavailable("maintenance".into()),
        2,
    );
    let retry = RetryPolicy::builder()
        .max_retries(2)
        .initial_delay(Duration::from_millis(1))
        .jitter(0.0)
        .build();
    let store = store_over(Arc::clone(&backend), retry);

    store
        .send(UserAddressesAction::LoadUserAddresses { user_id: "current".into() }.into())
        .await
        .unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    let ids: Vec<Option<String>> = store
        .state(|s| s.addresses.list.iter().map(|a| a.id.clone()).collect())
        .await;
    assert_eq!(ids, vec![Some("address1".to_string()), Some("address2".to_string())]);
}

#[tokio::test]
async fn permanent_failure_resets_the_slice() {
    let backend = Arc::new(InMemoryBackend::sample().unwrap());
    let store = store_over(Arc::clone(&backend), RetryPolicy::none());

    store
        .send(UserAddressesAction::LoadUserAddresses { user_id: "current".into() }.into())
        .await
        .unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();
    assert_eq!(store.state(|s| s.addresses.list.len()).await, 2);

    backend.fail_next(BackendOperation::LoadAddresses, OccError::Unauthorized, 1);
    store
        .send(UserAddressesAction::LoadUserAddresses { user_id: "current".into() }.into())
        .await
        .unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    assert!(store.state(|s| s.addresses.is_initial()).await);
}

#[tokio::test]
async fn facet_value_selection_runs_a_filtered_search() {
    let store = sample_store();
    store.send(search("lens")).await.unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    let facets = store.state(|s| s.search.results.facets.clone()).await;
    let lenses = facets[0]
        .values
        .iter()
        .find(|v| v.name == "Camera Lenses")
        .unwrap()
        .clone();
    assert!(!lenses.selected);

    store
        .send(FacetNavigationAction::ToggleValue(lenses.query.clone()).into())
        .await
        .unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    let results = store.state(|s| s.search.results.clone()).await;
    assert_eq!(results.current_query.as_deref(), Some(lenses.query.as_str()));
    assert_eq!(results.products.len(), lenses.count as usize);
    assert!(results.products.iter().all(|p| p.categories.iter().any(|c| c == "lenses")));
}

#[tokio::test]
async fn clean_cancels_a_running_search() {
    let backend = InMemoryBackend::sample()
        .unwrap()
        .with_query_latency("camera", Duration::from_millis(300));
    let store = store_over(Arc::new(backend), RetryPolicy::none());

    store.send(search("camera")).await.unwrap();
    assert!(store.state(|s| s.search.loading).await);

    store
        .send(ProductSearchAction::CleanProductSearch.into())
        .await
        .unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();

    assert!(store.state(|s| s.search.is_initial()).await);
}

#[tokio::test]
async fn review_combines_cart_mode_and_country() {
    let store = sample_store();
    store
        .send(UserAddressesAction::LoadUserAddresses { user_id: "current".into() }.into())
        .await
        .unwrap();
    store
        .send(
            CartAction::LoadCart {
                user_id: "current".into(),
                cart_id: "current".into(),
            }
            .into(),
        )
        .await
        .unwrap();
    store.wait_idle(TIMEOUT).await.unwrap();
    store
        .send(DeliveryModesAction::SetDeliveryMode("standard-gross".into()).into())
        .await
        .unwrap();

    let state = store.snapshot();
    assert_eq!(selectors::selected_delivery_mode(&state), None);
    let address = selectors::addresses(&state)
        .into_iter()
        .find(|a| a.default_address)
        .unwrap();

    let mut review = ReviewSubmit::open(&store, &address, "current", "current")
        .await
        .unwrap();
    let details = review
        .wait_for(|d| d.delivery_mode.is_some() && d.country_name.is_some(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(details.cart.code.as_deref(), Some("00001245"));
    assert_eq!(details.entries.len(), 2);
    assert_eq!(details.delivery_mode.unwrap().code, "standard-gross");
    assert_eq!(details.country_name.as_deref(), Some("Japan"));
    assert_eq!(
        selectors::country("JP")(&store.snapshot()).and_then(|c| c.name),
        Some("Japan".to_string())
    );
}
