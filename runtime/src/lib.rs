//! # MVI Store Runtime
//!
//! Runtime implementation of the Model-View-Intent store.
//!
//! This crate provides the [`Store`] that serializes submitted intents into a
//! strictly ordered sequence of state transitions and exposes the current
//! state as a live, replaying observable.
//!
//! ## Core Components
//!
//! - **Store**: Owns the current state and the two pipeline stages
//! - **Interpretation stage**: Sequential consumer turning intents into actions
//! - **Reduction stage**: Sequential consumer folding actions into new states,
//!   the only writer of the state cell
//! - **Queues**: Intent and action buffers, see [`QueuePolicy`]
//!
//! ## Example
//!
//! ```ignore
//! use mvi_store_runtime::Store;
//!
//! let store = Store::new(CounterState::initial(), CounterInterpreter, CounterReducer);
//!
//! // Fire and forget
//! store.submit(CounterIntent::Increment);
//!
//! // Observe: the first value is the latest state, then every newer one
//! let mut observer = store.observe();
//! while let Some(state) = observer.next().await {
//!     println!("{}", state.value);
//! }
//! ```

/// Stage queues and their buffering policy
pub mod queue;

/// Store configuration
pub mod config;

/// Health reporting
pub mod health;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use crate::store::StoreStatus;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The store no longer accepts intents
        ///
        /// Returned by `try_submit()` and `settle()` after `stop()` or after a
        /// pipeline stage crashed.
        #[error("Store is not running (status: {0})")]
        NotRunning(StoreStatus),

        /// The lossy intent queue is full and the intent was dropped
        #[error("Intent queue is full, intent dropped")]
        QueueFull,

        /// The interpretation stage is gone
        #[error("Intent channel closed")]
        ChannelClosed,

        /// Timeout waiting for a state condition
        #[error("Timeout waiting for state")]
        Timeout,

        /// The state cell closed before the awaited condition held
        #[error("Store stopped before the awaited state was reached")]
        Stopped,

        /// A pipeline stage terminated with a panic
        #[error("Stage '{stage}' failed: {reason}")]
        StageFailed {
            /// Which stage crashed (`interpret` or `reduce`)
            stage: &'static str,
            /// Panic description
            reason: String,
        },

        /// A pipeline stage did not finish within the stop timeout and was aborted
        #[error("Stage '{0}' did not stop in time and was aborted")]
        StopTimeout(&'static str),
    }
}

pub use config::{ConfigError, StoreConfig};
pub use error::StoreError;
pub use health::{HealthCheck, HealthStatus};
pub use queue::QueuePolicy;
pub use store::{StateObserver, Store, StoreStatus};

/// Store module - The runtime for interpreters and reducers
pub mod store {
    use crate::config::StoreConfig;
    use crate::error::StoreError;
    use crate::health::HealthCheck;
    use crate::metrics::StoreMetrics;
    use crate::queue::{self, OfferError, QueueReceiver, QueueSender};
    use futures::Stream;
    use mvi_store_core::{interpreter::Interpreter, reducer::Reducer};
    use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::{Duration, Instant};
    use tokio::sync::{broadcast, watch};
    use tokio::task::JoinHandle;
    use tracing::Instrument;

    const RUNNING: u8 = 0;
    const STOPPED: u8 = 1;
    const FAILED: u8 = 2;

    /// Lifecycle of a store
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreStatus {
        /// Both stages are consuming
        Running,
        /// `stop()` was called
        Stopped,
        /// A stage terminated with a panic
        Failed,
    }

    impl StoreStatus {
        const fn from_u8(value: u8) -> Self {
            match value {
                RUNNING => Self::Running,
                STOPPED => Self::Stopped,
                _ => Self::Failed,
            }
        }
    }

    impl std::fmt::Display for StoreStatus {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Running => write!(f, "running"),
                Self::Stopped => write!(f, "stopped"),
                Self::Failed => write!(f, "failed"),
            }
        }
    }

    /// Bookkeeping shared between the store handle and both stages
    struct Shared {
        status: AtomicU8,
        /// Intents accepted but not yet reduced or discarded
        pending: watch::Sender<usize>,
        interpret_failures: AtomicU64,
    }

    impl Shared {
        fn new() -> Self {
            let (pending, _) = watch::channel(0);
            Self {
                status: AtomicU8::new(RUNNING),
                pending,
                interpret_failures: AtomicU64::new(0),
            }
        }

        fn status(&self) -> StoreStatus {
            StoreStatus::from_u8(self.status.load(Ordering::Acquire))
        }

        fn complete_one(&self) {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
        }
    }

    /// Marks the store failed if its stage unwinds from a panic
    struct StageGuard {
        stage: &'static str,
        shared: Arc<Shared>,
    }

    impl Drop for StageGuard {
        fn drop(&mut self) {
            if std::thread::panicking() {
                self.shared.status.store(FAILED, Ordering::Release);
                // Nothing will complete the outstanding work; wake `settle()` callers
                self.shared.pending.send_replace(0);
                StoreMetrics::record_crash(self.stage);
                tracing::error!(stage = self.stage, "Pipeline stage panicked, store failed");
            } else {
                tracing::debug!(stage = self.stage, "Pipeline stage finished");
            }
        }
    }

    struct Stages {
        interpret: JoinHandle<()>,
        reduce: JoinHandle<()>,
    }

    struct Inner<N, R>
    where
        N: Interpreter<Action = R::Action>,
        R: Reducer,
    {
        intents: QueueSender<N::Intent>,
        state: watch::Receiver<R::State>,
        transitions: broadcast::Sender<R::State>,
        shutdown: watch::Sender<bool>,
        stages: Mutex<Option<Stages>>,
        shared: Arc<Shared>,
        config: StoreConfig,
    }

    impl<N, R> Drop for Inner<N, R>
    where
        N: Interpreter<Action = R::Action>,
        R: Reducer,
    {
        fn drop(&mut self) {
            self.shutdown.send_replace(true);
            let stages = self
                .stages
                .get_mut()
                .map_or_else(|poisoned| poisoned.into_inner().take(), Option::take);
            if let Some(stages) = stages {
                stages.interpret.abort();
                stages.reduce.abort();
            }
        }
    }

    /// The Store - unidirectional state container
    ///
    /// The Store manages:
    /// 1. The current state (a `watch` cell written only by the reduction stage)
    /// 2. The interpretation stage (intent → action, may suspend)
    /// 3. The reduction stage (state + action → state, synchronous)
    /// 4. The lifecycle of both stages
    ///
    /// Cloning a store is cheap; every clone addresses the same pipeline.
    /// Dropping the last clone aborts both stages.
    ///
    /// # Type Parameters
    ///
    /// - `N`: Interpreter implementation
    /// - `R`: Reducer implementation, sharing `N`'s action type
    ///
    /// # Ordering
    ///
    /// If intent A is submitted before intent B, A's action is reduced before
    /// B's, even when A takes longer to interpret.
    pub struct Store<N, R>
    where
        N: Interpreter<Action = R::Action>,
        R: Reducer,
    {
        inner: Arc<Inner<N, R>>,
    }

    impl<N, R> Clone for Store<N, R>
    where
        N: Interpreter<Action = R::Action>,
        R: Reducer,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<N, R> Store<N, R>
    where
        N: Interpreter<Action = R::Action> + 'static,
        R: Reducer + 'static,
        N::Intent: Send + 'static,
        R::Action: Send + 'static,
        R::State: Clone + PartialEq + Send + Sync + 'static,
    {
        /// Create a new store with default configuration
        ///
        /// Spawns both pipeline stages on the current tokio runtime.
        ///
        /// # Panics
        ///
        /// Panics if called outside of a tokio runtime.
        #[must_use]
        pub fn new(initial_state: R::State, interpreter: N, reducer: R) -> Self {
            Self::with_config(initial_state, interpreter, reducer, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default()
        ///     .with_queue_policy(QueuePolicy::drop_newest(1));
        ///
        /// let store = Store::with_config(
        ///     CounterState::initial(),
        ///     CounterInterpreter,
        ///     CounterReducer,
        ///     config,
        /// );
        /// ```
        ///
        /// # Panics
        ///
        /// Panics if called outside of a tokio runtime.
        #[must_use]
        pub fn with_config(
            initial_state: R::State,
            interpreter: N,
            reducer: R,
            config: StoreConfig,
        ) -> Self {
            let (intent_tx, intent_rx) = queue::channel(config.queue);
            let (action_tx, action_rx) = queue::channel(config.queue);
            let (state_tx, state_rx) = watch::channel(initial_state);
            let (transitions, _) = broadcast::channel(config.transition_capacity.max(1));
            let (shutdown, _) = watch::channel(false);
            let shared = Arc::new(Shared::new());

            let interpret = tokio::spawn(
                run_interpretation(
                    interpreter,
                    intent_rx,
                    action_tx,
                    Arc::clone(&shared),
                    shutdown.subscribe(),
                )
                .instrument(tracing::debug_span!("store_stage", stage = "interpret")),
            );
            let reduce = tokio::spawn(
                run_reduction(
                    reducer,
                    action_rx,
                    state_tx,
                    transitions.clone(),
                    Arc::clone(&shared),
                    shutdown.subscribe(),
                )
                .instrument(tracing::debug_span!("store_stage", stage = "reduce")),
            );

            tracing::debug!(queue = ?config.queue, "Store started");

            Self {
                inner: Arc::new(Inner {
                    intents: intent_tx,
                    state: state_rx,
                    transitions,
                    shutdown,
                    stages: Mutex::new(Some(Stages { interpret, reduce })),
                    shared,
                    config,
                }),
            }
        }

        /// Submit an intent for asynchronous processing
        ///
        /// Never blocks and never reports an error. An intent that cannot be
        /// enqueued (lossy queue full, store not running) is logged and
        /// counted, then dropped. Use [`Store::try_submit`] to observe that.
        #[tracing::instrument(skip(self, intent), name = "store_submit")]
        pub fn submit(&self, intent: N::Intent) {
            if let Err(error) = self.try_submit(intent) {
                tracing::warn!(%error, "Intent dropped");
            }
        }

        /// Submit an intent, reporting why it was not accepted
        ///
        /// # Errors
        ///
        /// - [`StoreError::NotRunning`]: the store was stopped or has failed
        /// - [`StoreError::QueueFull`]: the lossy intent queue is full
        /// - [`StoreError::ChannelClosed`]: the interpretation stage is gone
        pub fn try_submit(&self, intent: N::Intent) -> Result<(), StoreError> {
            let shared = &self.inner.shared;
            let status = shared.status();
            if status != StoreStatus::Running {
                StoreMetrics::record_rejected();
                return Err(StoreError::NotRunning(status));
            }

            // Counted before the offer so a fast stage cannot complete it first
            shared.pending.send_modify(|n| *n += 1);

            match self.inner.intents.offer(intent) {
                Ok(()) => {
                    StoreMetrics::record_submitted();
                    tracing::trace!("Intent enqueued");
                    Ok(())
                },
                Err(OfferError::Full(_)) => {
                    shared.complete_one();
                    StoreMetrics::record_dropped("intent");
                    Err(StoreError::QueueFull)
                },
                Err(OfferError::Closed(_)) => {
                    shared.complete_one();
                    StoreMetrics::record_rejected();
                    Err(StoreError::ChannelClosed)
                },
            }
        }

        /// Snapshot of the latest state
        #[must_use]
        pub fn current_state(&self) -> R::State {
            self.inner.state.borrow().clone()
        }

        /// Read the latest state via a closure
        ///
        /// ```ignore
        /// let value = store.state(|s| s.value);
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            f(&self.inner.state.borrow())
        }

        /// Observe the state
        ///
        /// The returned observer first yields the latest state, then each newer
        /// state. Observation is conflated: a slow observer skips intermediate
        /// states and always catches up to the latest one. A reduction that
        /// yields a state equal to the current one does not wake observers. Use
        /// [`Store::subscribe_transitions`] to see every transition.
        #[must_use]
        pub fn observe(&self) -> StateObserver<R::State> {
            StateObserver {
                rx: self.inner.state.clone(),
                primed: false,
            }
        }

        /// Subscribe to every state published from now on
        ///
        /// Includes reductions that left the state unchanged.
        ///
        /// Receivers that fall more than `transition_capacity` states behind get
        /// [`broadcast::error::RecvError::Lagged`].
        #[must_use]
        pub fn subscribe_transitions(&self) -> broadcast::Receiver<R::State> {
            self.inner.transitions.subscribe()
        }

        /// Wait until the state satisfies `predicate`
        ///
        /// Checks the current state first.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: the predicate did not hold in time
        /// - [`StoreError::Stopped`]: the reduction stage ended first
        pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Result<R::State, StoreError>
        where
            F: FnMut(&R::State) -> bool,
        {
            let mut rx = self.inner.state.clone();
            let result = tokio::time::timeout(timeout, rx.wait_for(predicate))
                .await
                .map_err(|_| StoreError::Timeout)?;
            result.map(|state| state.clone()).map_err(|_| StoreError::Stopped)
        }

        /// Wait until every accepted intent has been fully processed
        ///
        /// An intent is fully processed once its action has been reduced, or
        /// once it was discarded by a failed interpretation or a full action
        /// queue. Returns the resulting state.
        ///
        /// # Errors
        ///
        /// - [`StoreError::NotRunning`]: the store is stopped or failed, including
        ///   a stage crash while waiting
        /// - [`StoreError::Timeout`]: work was still pending when the timeout expired
        pub async fn settle(&self, timeout: Duration) -> Result<R::State, StoreError> {
            let shared = &self.inner.shared;
            let status = shared.status();
            if status != StoreStatus::Running {
                return Err(StoreError::NotRunning(status));
            }

            let mut pending = shared.pending.subscribe();
            tokio::time::timeout(timeout, pending.wait_for(|n| *n == 0))
                .await
                .map_err(|_| StoreError::Timeout)?
                .map_err(|_| StoreError::Stopped)?;

            let status = shared.status();
            if status == StoreStatus::Running {
                Ok(self.current_state())
            } else {
                Err(StoreError::NotRunning(status))
            }
        }

        /// Intents accepted but not yet fully processed
        #[must_use]
        pub fn pending(&self) -> usize {
            *self.inner.shared.pending.borrow()
        }

        /// Current lifecycle status
        #[must_use]
        pub fn status(&self) -> StoreStatus {
            self.inner.shared.status()
        }

        /// Perform a health check on the Store
        ///
        /// - Unhealthy once stopped or after a stage crashed
        /// - Degraded while running if any interpretation has failed
        #[must_use]
        pub fn health(&self) -> HealthCheck {
            let failures = self.inner.shared.interpret_failures.load(Ordering::Relaxed);
            HealthCheck::assess(self.status(), self.pending(), failures)
        }

        /// Stop the store
        ///
        /// Signals both stages, then waits for each up to the configured stop
        /// timeout. An in-flight interpretation and any queued intents are
        /// abandoned. Calling `stop()` again is a no-op.
        ///
        /// # Errors
        ///
        /// - [`StoreError::StageFailed`]: a stage had panicked
        /// - [`StoreError::StopTimeout`]: a stage did not finish in time and was aborted
        pub async fn stop(&self) -> Result<(), StoreError> {
            let Some(stages) = self.take_stages() else {
                return Ok(());
            };

            let shared = &self.inner.shared;
            tracing::info!(pending = self.pending(), "Stopping store");
            let _ = shared.status.compare_exchange(
                RUNNING,
                STOPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            self.inner.shutdown.send_replace(true);
            shared.pending.send_replace(0);

            let timeout = self.inner.config.stop_timeout;
            let mut outcome = Ok(());
            for (stage, handle) in [("interpret", stages.interpret), ("reduce", stages.reduce)] {
                let abort = handle.abort_handle();
                let error = match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(())) => None,
                    Ok(Err(join_error)) if join_error.is_panic() => Some(StoreError::StageFailed {
                        stage,
                        reason: join_error.to_string(),
                    }),
                    Ok(Err(_)) => None,
                    Err(_) => {
                        abort.abort();
                        tracing::error!(stage, ?timeout, "Stage did not stop in time, aborted");
                        Some(StoreError::StopTimeout(stage))
                    },
                };
                if let (Some(error), true) = (error, outcome.is_ok()) {
                    outcome = Err(error);
                }
            }

            tracing::info!(status = %self.status(), "Store stopped");
            outcome
        }

        fn take_stages(&self) -> Option<Stages> {
            self.inner
                .stages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        }
    }

    /// Live, replaying view of a store's state
    ///
    /// Created by [`Store::observe`].
    pub struct StateObserver<S> {
        rx: watch::Receiver<S>,
        primed: bool,
    }

    impl<S> StateObserver<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        /// Latest state, without waiting
        #[must_use]
        pub fn current(&self) -> S {
            self.rx.borrow().clone()
        }

        /// Next state to render
        ///
        /// The first call returns the latest state immediately. Later calls
        /// wait for a newer one. Returns `None` once the store has stopped.
        pub async fn next(&mut self) -> Option<S> {
            if self.primed {
                self.rx.changed().await.ok()?;
            } else {
                self.primed = true;
            }
            Some(self.rx.borrow_and_update().clone())
        }

        /// Turn the observer into a [`Stream`] of states
        pub fn into_stream(self) -> impl Stream<Item = S> + Send {
            futures::stream::unfold(self, |mut observer| async move {
                observer.next().await.map(|state| (state, observer))
            })
        }
    }

    async fn run_interpretation<N>(
        interpreter: N,
        mut intents: QueueReceiver<N::Intent>,
        actions: QueueSender<N::Action>,
        shared: Arc<Shared>,
        mut shutdown: watch::Receiver<bool>,
    ) where
        N: Interpreter,
    {
        let _guard = StageGuard {
            stage: "interpret",
            shared: Arc::clone(&shared),
        };

        loop {
            let intent = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                intent = intents.recv() => match intent {
                    Some(intent) => intent,
                    None => break,
                },
            };

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    tracing::debug!("Abandoning in-flight interpretation");
                    break;
                },
                result = interpreter.interpret(intent) => result,
            };
            StoreMetrics::record_interpretation(started.elapsed(), result.is_ok());

            match result {
                Ok(action) => match actions.offer(action) {
                    Ok(()) => tracing::trace!("Action enqueued"),
                    Err(OfferError::Full(_)) => {
                        StoreMetrics::record_dropped("action");
                        tracing::warn!("Action queue is full, action dropped");
                        shared.complete_one();
                    },
                    Err(OfferError::Closed(_)) => break,
                },
                Err(error) => {
                    shared.interpret_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(%error, "Intent discarded");
                    shared.complete_one();
                },
            }
        }
    }

    async fn run_reduction<R>(
        reducer: R,
        mut actions: QueueReceiver<R::Action>,
        state: watch::Sender<R::State>,
        transitions: broadcast::Sender<R::State>,
        shared: Arc<Shared>,
        mut shutdown: watch::Receiver<bool>,
    ) where
        R: Reducer,
        R::State: Clone + PartialEq,
    {
        let _guard = StageGuard {
            stage: "reduce",
            shared: Arc::clone(&shared),
        };

        loop {
            let action = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                action = actions.recv() => match action {
                    Some(action) => action,
                    None => break,
                },
            };

            let started = Instant::now();
            let next = {
                let current = state.borrow();
                reducer.reduce(&current, action)
            };
            StoreMetrics::record_transition(started.elapsed());

            // Observers are only woken by a distinct state
            let changed = state.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next.clone();
                    true
                }
            });
            // No subscribers is fine
            let _ = transitions.send(next);
            tracing::debug!(changed, "State transition published");

            shared.complete_one();
        }
    }
}
