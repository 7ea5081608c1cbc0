//! Integration tests for the Store runtime
//!
//! Covers serial dispatch, the effect feedback loop, action broadcasting,
//! selections and shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use storefront_state_core::effect::{Effect, EffectId};
use storefront_state_core::{reducer::Reducer, smallvec, SmallVec};
use storefront_state_macros::Action;
use storefront_state_runtime::{Store, StoreConfig, StoreError};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Action, Debug, Clone, PartialEq)]
enum TestAction {
    /// Start a multi-step load with a correlation id
    #[start]
    StartLoad { id: u64 },
    /// One step finished
    #[success]
    StepCompleted { id: u64, step: u32 },
    /// Terminal action
    #[success]
    LoadCompleted { id: u64 },
    /// Never produced
    #[fail]
    LoadFailed { id: u64 },
    /// Synchronous append
    Append(u32),
    /// Append each value through a sequential effect chain
    AppendInOrder(Vec<u32>),
    /// Produce an action immediately
    Ping,
    /// Produced by `Ping`
    #[success]
    Pong { value: u32 },
    /// Leaves the state alone
    Touch,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct TestState {
    counter: u32,
    steps: Vec<u32>,
    appended: Vec<u32>,
    label: String,
}

struct TestReducer;

fn step_effect(id: u64, step: u32) -> Effect<TestAction> {
    Effect::Future(Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Some(TestAction::StepCompleted { id, step })
    }))
}

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TestAction::StartLoad { id } => {
                state.steps.clear();
                smallvec![step_effect(id, 1)]
            },
            TestAction::StepCompleted { id, step } => {
                state.steps.push(step);
                if step < 3 {
                    smallvec![step_effect(id, step + 1)]
                } else {
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(TestAction::LoadCompleted { id })
                    }))]
                }
            },
            TestAction::LoadCompleted { .. } | TestAction::LoadFailed { .. } | TestAction::Touch => {
                smallvec![]
            },
            TestAction::Append(value) => {
                state.appended.push(value);
                smallvec![]
            },
            TestAction::AppendInOrder(values) => {
                let chain = values
                    .into_iter()
                    .rev()
                    .enumerate()
                    .map(|(i, value)| Effect::Delay {
                        // Later values have shorter delays; only sequencing keeps order
                        duration: Duration::from_millis(1 + i as u64 * 5),
                        action: Box::new(TestAction::Append(value)),
                    })
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                smallvec![Effect::chain(chain)]
            },
            TestAction::Ping => {
                state.counter += 1;
                let value = state.counter;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(TestAction::Pong { value })
                }))]
            },
            TestAction::Pong { value } => {
                state.label = format!("pong-{value}");
                smallvec![]
            },
        }
    }
}

fn new_store() -> Store<TestState, TestAction, (), TestReducer> {
    Store::new(TestState::default(), TestReducer, ())
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_actions_reduce_in_send_order() {
    let store = new_store();
    for value in 0..50 {
        store.send(TestAction::Append(value)).await.unwrap();
    }
    assert_eq!(
        store.state(|s| s.appended.clone()).await,
        (0..50).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_sequential_effects_run_in_order() {
    let store = new_store();
    store
        .send(TestAction::AppendInOrder(vec![1, 2, 3, 4]))
        .await
        .unwrap();

    store.wait_idle(Duration::from_secs(2)).await.unwrap();
    assert_eq!(store.state(|s| s.appended.clone()).await, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_wait_idle_covers_feedback_cascade() {
    let store = new_store();
    store.send(TestAction::StartLoad { id: 7 }).await.unwrap();

    store.wait_idle(Duration::from_secs(2)).await.unwrap();
    assert_eq!(store.state(|s| s.steps.clone()).await, vec![1, 2, 3]);
    assert_eq!(store.pending_effects(), 0);
}

// ============================================================================
// Broadcasting
// ============================================================================

#[tokio::test]
async fn test_send_and_wait_for_immediate() {
    let store = new_store();

    let result = store
        .send_and_wait_for(
            TestAction::Ping,
            |action| matches!(action, TestAction::Pong { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(result, TestAction::Pong { value: 1 });
    // Broadcast happens after the feedback action was reduced
    assert_eq!(store.state(|s| s.label.clone()).await, "pong-1");
}

#[tokio::test]
async fn test_send_and_wait_for_multi_step() {
    let store = new_store();

    let result = store
        .send_and_wait_for(
            TestAction::StartLoad { id: 42 },
            |action| matches!(action, TestAction::LoadCompleted { id: 42 }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result, Ok(TestAction::LoadCompleted { id: 42 }));
    assert_eq!(store.state(|s| s.steps.clone()).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = new_store();

    let result = store
        .send_and_wait_for(
            TestAction::StartLoad { id: 99 },
            |action| matches!(action, TestAction::LoadFailed { id: 99 }),
            Duration::from_millis(50),
        )
        .await;

    assert_eq!(result, Err(StoreError::Timeout));
}

#[tokio::test]
async fn test_correlation_id_filtering() {
    let store = Arc::new(new_store());

    let mut handles = vec![];
    for id in 1..=3 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    TestAction::StartLoad { id },
                    move |action| matches!(action, TestAction::LoadCompleted { id: done } if *done == id),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let id = i as u64 + 1;
        let result = handle.await.expect("Task panicked");
        assert_eq!(result, Ok(TestAction::LoadCompleted { id }));
    }
}

#[tokio::test]
async fn test_subscribe_actions_only_sees_effect_actions() {
    let store = new_store();
    let mut rx = store.subscribe_actions();

    store.send(TestAction::Append(1)).await.unwrap();
    store.send(TestAction::Ping).await.unwrap();
    store.wait_idle(Duration::from_secs(1)).await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), TestAction::Pong { value: 1 });
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_lagging_subscriber() {
    let store = Store::with_config(
        TestState::default(),
        TestReducer,
        (),
        StoreConfig::default().with_broadcast_capacity(4),
    );
    let mut rx = store.subscribe_actions();

    for _ in 0..20 {
        store.send(TestAction::Ping).await.unwrap();
    }
    store.wait_idle(Duration::from_secs(1)).await.unwrap();

    let mut received = 0;
    let mut lagged = false;
    loop {
        match rx.try_recv() {
            Ok(_) => received += 1,
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => lagged = true,
            Err(_) => break,
        }
    }

    assert!(lagged, "Expected subscriber to lag");
    assert!(received > 0 && received < 20);
    // The store itself is unaffected
    assert_eq!(store.state(|s| s.counter).await, 20);
}

// ============================================================================
// Observers
// ============================================================================

#[tokio::test]
async fn test_state_observers_skip_unchanged_dispatches() {
    let store = new_store();
    let mut states = store.subscribe_state();

    store.send(TestAction::Touch).await.unwrap();
    assert!(!states.has_changed().unwrap());

    store.send(TestAction::Append(3)).await.unwrap();
    assert!(states.has_changed().unwrap());
    assert_eq!(states.borrow_and_update().appended, vec![3]);
}

#[tokio::test]
async fn test_selection_only_fires_on_distinct_values() {
    let store = new_store();
    let mut steps = store.select(|s: &TestState| s.steps.len());
    assert_eq!(steps.get(), 0);

    // Changes other parts of the state only
    store.send(TestAction::Append(1)).await.unwrap();
    store.send(TestAction::Append(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!steps.has_changed().unwrap());

    store.send(TestAction::StartLoad { id: 1 }).await.unwrap();
    let done = steps
        .wait_for(|len| *len == 3, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(done, 3);
}

#[tokio::test]
async fn test_selection_stops_on_shutdown() {
    let store = new_store();
    let mut label = store.select(|s: &TestState| s.label.clone());

    store.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(label.changed().await, Err(StoreError::ChannelClosed));
}

// ============================================================================
// Cancellation and shutdown
// ============================================================================

#[derive(Action, Debug, Clone, PartialEq)]
enum QueryAction {
    #[start]
    Query { text: String, delay_ms: u64 },
    #[success]
    QueryDone(String),
    #[reset]
    Abandon,
}

struct QueryReducer;

const QUERY: EffectId = EffectId::new("query");

impl Reducer for QueryReducer {
    type State = Vec<String>;
    type Action = QueryAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            QueryAction::Query { text, delay_ms } => smallvec![Effect::Future(Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Some(QueryAction::QueryDone(text))
            }))
            .cancellable(QUERY)],
            QueryAction::QueryDone(text) => {
                state.push(text);
                smallvec![]
            },
            QueryAction::Abandon => {
                state.clear();
                smallvec![Effect::Cancel(QUERY)]
            },
        }
    }
}

#[tokio::test]
async fn test_newer_query_supersedes_older() {
    let store = Store::new(Vec::new(), QueryReducer, ());

    store
        .send(QueryAction::Query {
            text: "cam".into(),
            delay_ms: 100,
        })
        .await
        .unwrap();
    store
        .send(QueryAction::Query {
            text: "camera".into(),
            delay_ms: 10,
        })
        .await
        .unwrap();

    store.wait_idle(Duration::from_secs(1)).await.unwrap();
    assert_eq!(store.snapshot(), vec!["camera".to_string()]);
}

#[tokio::test]
async fn test_abandon_cancels_in_flight_query() {
    let store = Store::new(Vec::new(), QueryReducer, ());

    store
        .send(QueryAction::Query {
            text: "lens".into(),
            delay_ms: 50,
        })
        .await
        .unwrap();
    store.send(QueryAction::Abandon).await.unwrap();

    store.wait_idle(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_shutdown_waits_for_running_effects() {
    let store = Store::new(Vec::new(), QueryReducer, ());
    store
        .send(QueryAction::Query {
            text: "tripod".into(),
            delay_ms: 20,
        })
        .await
        .unwrap();

    store.shutdown(Duration::from_secs(1)).await.unwrap();

    // The in-flight result was still reduced, new actions are rejected
    assert_eq!(store.snapshot(), vec!["tripod".to_string()]);
    assert_eq!(
        store.send(QueryAction::Abandon).await.unwrap_err(),
        StoreError::ShutdownInProgress
    );
}
