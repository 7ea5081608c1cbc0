//! # Storefront State Runtime
//!
//! The Store runtime that coordinates reducer execution, effect handling and
//! state observation for the storefront slices.
//!
//! ## Core Components
//!
//! - **Store**: owns the aggregate state and runs one reducer pass per action
//! - **Effect Executor**: runs effect descriptions and feeds produced actions
//!   back through the store
//! - **Observers**: `watch`-based state notifications and derived
//!   [`Selection`]s that only change when their selected value changes
//!
//! ## Example
//!
//! ```ignore
//! use storefront_state_runtime::Store;
//!
//! let store = Store::new(AppState::initial(), app_reducer(), environment);
//!
//! // Send an action
//! store.send(AppAction::Search(SearchAction::search("camera"))).await?;
//!
//! // Observe one derived value
//! let mut results = store.select(|s| s.search.results.clone());
//! let page = results.changed().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;
use storefront_state_core::{action::Action, effect::Effect, reducer::Reducer};
use tokio::sync::{watch, RwLock};

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// The remaining effects were aborted.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for an action, an effect or a state change
        #[error("Timeout waiting for store")]
        Timeout,

        /// An observer channel closed
        ///
        /// Typically because every handle to the store was dropped.
        #[error("Store channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use storefront_state_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Capacity of the broadcast channel for effect-produced actions
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Count of running effects with a way to wait for zero.
#[derive(Clone)]
struct EffectCounter(Arc<watch::Sender<usize>>);

impl EffectCounter {
    fn new() -> Self {
        Self(Arc::new(watch::channel(0).0))
    }

    fn enter(&self) -> CounterGuard {
        self.0.send_modify(|n| *n += 1);
        CounterGuard(self.clone())
    }

    fn current(&self) -> usize {
        *self.0.borrow()
    }

    async fn wait_zero(&self) {
        let mut rx = self.0.subscribe();
        loop {
            let idle = *rx.borrow_and_update() == 0;
            if idle || rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Decrements its counter on drop, including when the task is aborted.
struct CounterGuard(EffectCounter);

impl Drop for CounterGuard {
    fn drop(&mut self) {
        (self.0).0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Counters an effect task belongs to: the store-wide one and the one of the
/// `send` that produced it.
#[derive(Clone)]
struct Tracking {
    global: EffectCounter,
    local: EffectCounter,
}

impl Tracking {
    fn enter(&self) -> (CounterGuard, CounterGuard) {
        (self.global.enter(), self.local.enter())
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Waiting on it covers the effects returned
/// by that one reducer pass, including the reduction of the actions they
/// produce, but not effects returned by those later passes. Use
/// [`Store::wait_idle`] to wait for the whole cascade.
///
/// # Example
///
/// ```ignore
/// let handle = store.send(AppAction::LoadCountries).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: EffectCounter,
}

impl EffectHandle {
    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        Self {
            effects: EffectCounter::new(),
        }
    }

    /// Number of effects of this dispatch still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.current()
    }

    /// Wait for all effects to complete
    pub async fn wait(&self) {
        self.effects.wait_zero().await;
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish()
    }
}

/// Store lifecycle, published through a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// Accepting actions
    Running,
    /// Rejecting new actions, letting effects finish
    Draining,
    /// Effects aborted
    Halted,
}

async fn until_stopping(rx: &mut watch::Receiver<Lifecycle>) {
    loop {
        let running = *rx.borrow_and_update() == Lifecycle::Running;
        if !running || rx.changed().await.is_err() {
            return;
        }
    }
}

async fn until_halted(rx: &mut watch::Receiver<Lifecycle>) {
    loop {
        let halted = *rx.borrow_and_update() == Lifecycle::Halted;
        if halted {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A derived view of the store state.
///
/// Produced by [`Store::select`]. The value is recomputed after every
/// published state and only updates (and wakes [`Selection::changed`]) when
/// it differs from the previous value.
pub struct Selection<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Selection<T> {
    /// The current selected value
    #[must_use]
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Whether a value was published since the last `changed`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] once the selection stopped.
    pub fn has_changed(&self) -> Result<bool, StoreError> {
        self.rx.has_changed().map_err(|_| StoreError::ChannelClosed)
    }

    /// Wait for the next distinct value
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] once the selection stopped
    /// (store shut down or dropped).
    pub async fn changed(&mut self) -> Result<T, StoreError> {
        self.rx.changed().await.map_err(|_| StoreError::ChannelClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the selected value satisfies `predicate`
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if no matching value arrives in time
    /// - [`StoreError::ChannelClosed`] if the selection stopped
    pub async fn wait_for<P>(&mut self, predicate: P, timeout: Duration) -> Result<T, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        tokio::time::timeout(timeout, async {
            loop {
                let current = self.rx.borrow_and_update().clone();
                if predicate(&current) {
                    return Ok(current);
                }
                self.rx.changed().await.map_err(|_| StoreError::ChannelClosed)?;
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Selection").field(&*self.rx.borrow()).finish()
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        until_halted, until_stopping, Action, Arc, Duration, Effect, EffectCounter, EffectHandle,
        Lifecycle, Reducer, RwLock, Selection, StoreConfig, StoreError, Tracking,
    };
    use crate::metrics::StoreMetrics;
    use futures::future::{join_all, BoxFuture};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use storefront_state_core::effect::EffectId;
    use tokio::sync::{broadcast, watch};
    use tokio::task::{AbortHandle, JoinHandle};

    /// Running cancellable effects, keyed by id, with the token of the task
    /// that registered them.
    type CancellableRegistry = HashMap<EffectId, (u64, AbortHandle)>;

    struct Shared<S, A, E, R> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        /// Last published state
        published: watch::Sender<S>,
        /// Actions produced by effects, sent after they were reduced
        action_broadcast: broadcast::Sender<A>,
        lifecycle: watch::Sender<Lifecycle>,
        pending_effects: EffectCounter,
        cancellable: Mutex<CancellableRegistry>,
        next_token: AtomicU64,
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind a fair `RwLock`, so actions reduce in FIFO order)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    /// 5. Observers (state `watch`, action broadcast, selections)
    ///
    /// Cloning a store is cheap; clones share everything.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R> {
        shared: Arc<Shared<S, A, E, R>>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R> {
        fn clone(&self) -> Self {
            Self {
                shared: Arc::clone(&self.shared),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Clone + PartialEq + Send + Sync + 'static,
        A: Action + Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (published, _) = watch::channel(initial_state.clone());
            let (lifecycle, _) = watch::channel(Lifecycle::Running);

            Self {
                shared: Arc::new(Shared {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    config,
                    published,
                    action_broadcast,
                    lifecycle,
                    pending_effects: EffectCounter::new(),
                    cancellable: Mutex::new(HashMap::new()),
                    next_token: AtomicU64::new(0),
                }),
            }
        }

        /// The configuration this store was built with
        #[must_use]
        pub fn config(&self) -> &StoreConfig {
            &self.shared.config
        }

        /// The injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.shared.environment
        }

        /// Send an action to the store
        ///
        /// 1. Waits its turn on the state lock (FIFO with other senders)
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Publishes the state to observers if it changed
        /// 4. Starts the returned effects
        ///
        /// `send()` returns after starting effect execution, not completion.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if *self.shared.lifecycle.borrow() != Lifecycle::Running {
                tracing::warn!(action.kind = action.kind(), "Rejected action: store is shutting down");
                StoreMetrics::record_rejected();
                return Err(StoreError::ShutdownInProgress);
            }
            Ok(self.dispatch(action).await)
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes to the action broadcast before sending, so a fast
        /// effect cannot be missed. Matching actions are broadcast after
        /// they were reduced, so the state already reflects them on return.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.shared.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Slow consumers may miss actions (`RecvError::Lagged`) once the
        /// configured broadcast capacity is exceeded.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.shared.action_broadcast.subscribe()
        }

        /// Subscribe to state changes
        ///
        /// The receiver is notified once per dispatch that produced a state
        /// not equal to the previous one.
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<S> {
            self.shared.published.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let loading = store.state(|s| s.search.loading).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.shared.state.read().await;
            f(&state)
        }

        /// Clone of the last published state
        #[must_use]
        pub fn snapshot(&self) -> S {
            self.shared.published.borrow().clone()
        }

        /// Observe a value derived from the state
        ///
        /// `f` runs once now and again after every state change; the
        /// selection only updates when the result differs. The background
        /// task stops when the selection is dropped or the store shuts down.
        pub fn select<T, F>(&self, f: F) -> Selection<T>
        where
            F: Fn(&S) -> T + Send + 'static,
            T: Clone + PartialEq + Send + Sync + 'static,
        {
            let mut states = self.shared.published.subscribe();
            let initial = f(&states.borrow_and_update());
            let (tx, rx) = watch::channel(initial);
            let mut lifecycle = self.shared.lifecycle.subscribe();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = tx.closed() => break,
                        () = until_stopping(&mut lifecycle) => break,
                        changed = states.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            let next = f(&states.borrow_and_update());
                            tx.send_if_modified(|current| {
                                if *current == next {
                                    false
                                } else {
                                    *current = next;
                                    true
                                }
                            });
                        },
                    }
                }
                tracing::trace!("Selection stopped");
            });

            Selection { rx }
        }

        /// Number of effects currently running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.shared.pending_effects.current()
        }

        /// Wait until no effect is running
        ///
        /// Feedback actions start their effects before the effect that
        /// produced them finishes, so this covers whole cascades.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Timeout`] if effects are still running when
        /// the timeout elapses.
        pub async fn wait_idle(&self, timeout: Duration) -> Result<(), StoreError> {
            tokio::time::timeout(timeout, self.shared.pending_effects.wait_zero())
                .await
                .map_err(|_| StoreError::Timeout)
        }

        /// Gracefully shut down the store
        ///
        /// 1. Rejects new actions (actions fed back by running effects are
        ///    still reduced) and stops all selections
        /// 2. Waits for running effects
        /// 3. Aborts whatever is left when the timeout elapses
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] with the number of aborted
        /// effects if the timeout elapsed.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shared.lifecycle.send_if_modified(|l| {
                if *l == Lifecycle::Running {
                    *l = Lifecycle::Draining;
                    true
                } else {
                    false
                }
            });

            if tokio::time::timeout(timeout, self.shared.pending_effects.wait_zero())
                .await
                .is_ok()
            {
                tracing::info!("All effects completed, shutdown successful");
                StoreMetrics::record_shutdown("completed");
                return Ok(());
            }

            let pending = self.shared.pending_effects.current();
            tracing::error!(pending_effects = pending, "Shutdown timeout: aborting {} effects", pending);
            self.shared.lifecycle.send_replace(Lifecycle::Halted);
            StoreMetrics::record_shutdown("timeout");
            Err(StoreError::ShutdownTimeout(pending))
        }

        /// Shut down with the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_gracefully(&self) -> Result<(), StoreError> {
            self.shutdown(self.shared.config.shutdown_timeout).await
        }

        /// Run one reducer pass and start its effects.
        #[tracing::instrument(level = "debug", skip_all, fields(action.kind = action.kind()))]
        async fn dispatch(&self, action: A) -> EffectHandle {
            let kind = action.kind();
            let class = action.tag_class();
            let local = EffectCounter::new();
            let tracking = Tracking {
                global: self.shared.pending_effects.clone(),
                local: local.clone(),
            };

            let mut state = self.shared.state.write().await;

            let start = std::time::Instant::now();
            let effects = self.shared.reducer.reduce(&mut state, action, &self.shared.environment);
            StoreMetrics::record_action(kind, class, start.elapsed());

            let changed = self.shared.published.send_if_modified(|published| {
                if *published == *state {
                    false
                } else {
                    *published = state.clone();
                    true
                }
            });
            if changed {
                StoreMetrics::record_state_change();
            }
            tracing::trace!(changed, effects = effects.len(), "Reducer completed");

            // Started under the lock so effects register in dispatch order
            for effect in effects {
                self.execute_effect(effect, &tracking);
            }
            drop(state);

            EffectHandle { effects: local }
        }

        /// Reduce an action produced by an effect, then broadcast it.
        async fn feed(&self, action: A) {
            if *self.shared.lifecycle.borrow() == Lifecycle::Halted {
                tracing::debug!(action.kind = action.kind(), "Dropping feedback action after halt");
                return;
            }
            let observed = action.clone();
            self.dispatch(action).await;
            // No receivers is fine
            let _ = self.shared.action_broadcast.send(observed);
        }

        /// Start an effect returned by the reducer.
        ///
        /// Parallel children, cancellations and cancellable registrations
        /// happen synchronously; everything else runs on a spawned task.
        fn execute_effect(&self, effect: Effect<A>, tracking: &Tracking) {
            match effect {
                Effect::None => {},
                Effect::Parallel(effects) => {
                    StoreMetrics::record_effect("parallel");
                    for effect in effects {
                        self.execute_effect(effect, tracking);
                    }
                },
                Effect::Cancel(id) => {
                    StoreMetrics::record_effect("cancel");
                    self.cancel(id);
                },
                Effect::Cancellable { id, effect } => {
                    StoreMetrics::record_effect("cancellable");
                    // Detached; the registry keeps the abort handle
                    drop(self.spawn_cancellable(id, *effect, tracking));
                },
                effect => {
                    let body = self.run_effect(effect, tracking.clone());
                    drop(self.spawn_tracked(body, tracking));
                },
            }
        }

        /// Build the future that runs an effect to completion.
        fn run_effect(&self, effect: Effect<A>, tracking: Tracking) -> BoxFuture<'static, ()> {
            let store = self.clone();
            match effect {
                Effect::None => Box::pin(async {}),
                Effect::Future(fut) => {
                    StoreMetrics::record_effect("future");
                    Box::pin(async move {
                        if let Some(action) = fut.await {
                            tracing::trace!(action.kind = action.kind(), "Effect::Future produced an action");
                            store.feed(action).await;
                        }
                    })
                },
                Effect::Delay { duration, action } => {
                    StoreMetrics::record_effect("delay");
                    Box::pin(async move {
                        tokio::time::sleep(duration).await;
                        store.feed(*action).await;
                    })
                },
                Effect::Parallel(effects) => {
                    StoreMetrics::record_effect("parallel");
                    let children: Vec<_> = effects
                        .into_iter()
                        .map(|effect| self.run_effect(effect, tracking.clone()))
                        .collect();
                    Box::pin(async move {
                        join_all(children).await;
                    })
                },
                Effect::Sequential(effects) => {
                    StoreMetrics::record_effect("sequential");
                    Box::pin(async move {
                        for effect in effects {
                            store.run_effect(effect, tracking.clone()).await;
                        }
                    })
                },
                Effect::Cancellable { id, effect } => {
                    StoreMetrics::record_effect("cancellable");
                    let join = self.spawn_cancellable(id, *effect, &tracking);
                    Box::pin(async move {
                        // An aborted child ends the wait without a result
                        let _ = join.await;
                    })
                },
                Effect::Cancel(id) => {
                    StoreMetrics::record_effect("cancel");
                    Box::pin(async move { store.cancel(id) })
                },
            }
        }

        /// Spawn a tracked task that also stops when the store halts.
        fn spawn_tracked(&self, body: BoxFuture<'static, ()>, tracking: &Tracking) -> JoinHandle<()> {
            let guards = tracking.enter();
            StoreMetrics::record_pending(self.shared.pending_effects.current());
            let mut lifecycle = self.shared.lifecycle.subscribe();

            tokio::spawn(async move {
                let _guards = guards;
                tokio::select! {
                    () = body => {},
                    () = until_halted(&mut lifecycle) => {
                        tracing::debug!("Effect aborted by shutdown");
                    },
                }
            })
        }

        /// Spawn a cancellable effect, aborting the running one with the same id.
        fn spawn_cancellable(&self, id: EffectId, effect: Effect<A>, tracking: &Tracking) -> JoinHandle<()> {
            let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
            let body = self.run_effect(effect, tracking.clone());
            let release = Release {
                store: self.clone(),
                id,
                token,
            };

            let (join, previous) = {
                // Held across the spawn so the task cannot release before it is registered
                let mut registry = self.registry();
                let join = self.spawn_tracked(
                    Box::pin(async move {
                        let _release = release;
                        body.await;
                    }),
                    tracking,
                );
                let previous = registry.insert(id, (token, join.abort_handle()));
                (join, previous)
            };

            if let Some((_, previous)) = previous {
                if !previous.is_finished() {
                    tracing::debug!(effect.id = %id, "Cancelling superseded effect");
                    StoreMetrics::record_cancelled(id.as_str());
                }
                previous.abort();
            }
            join
        }

        /// Abort the running cancellable effect registered under `id`.
        fn cancel(&self, id: EffectId) {
            let entry = self.registry().remove(&id);
            if let Some((_, handle)) = entry {
                tracing::debug!(effect.id = %id, "Cancelling effect");
                StoreMetrics::record_cancelled(id.as_str());
                handle.abort();
            }
        }

        fn registry(&self) -> MutexGuard<'_, CancellableRegistry> {
            self.shared
                .cancellable
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Removes a finished (or aborted) cancellable task from the registry
    /// unless a newer task took its id.
    struct Release<S, A, E, R> {
        store: Store<S, A, E, R>,
        id: EffectId,
        token: u64,
    }

    impl<S, A, E, R> Drop for Release<S, A, E, R> {
        fn drop(&mut self) {
            let mut registry = self
                .store
                .shared
                .cancellable
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if registry.get(&self.id).is_some_and(|(token, _)| *token == self.token) {
                registry.remove(&self.id);
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
