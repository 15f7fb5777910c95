//! # MVI Store Testing
//!
//! Testing utilities and helpers for the MVI store.
//!
//! This crate provides:
//! - Given-When-Then harnesses for reducers and interpreters
//! - Mock interpreters and reducers for pipeline tests
//! - Helpers for observing stores in tests
//!
//! ## Example
//!
//! ```ignore
//! use mvi_store_testing::helpers::collect_states;
//! use mvi_store_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_counter_flow() {
//!     let store = Store::new(CounterState::initial(), CounterInterpreter, CounterReducer);
//!     let mut observer = store.observe();
//!
//!     store.submit(CounterIntent::Increment);
//!
//!     let states = collect_states(&mut observer, 2, Duration::from_secs(1)).await.unwrap();
//!     assert_eq!(states.last().unwrap().value, 1);
//! }
//! ```

use mvi_store_core::BoxFuture;
use mvi_store_core::interpreter::{InterpretError, Interpreter};
use mvi_store_core::reducer::Reducer;


/// Mock implementations for pipeline tests
pub mod mocks {
    use super::{BoxFuture, InterpretError, Interpreter, Reducer};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    /// Interpreter that sleeps before delegating
    ///
    /// The delay is chosen per intent, which makes it easy to have an early
    /// intent finish interpreting after a later one would have.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let slow_first = DelayedInterpreter::new(CounterInterpreter, |intent| match intent {
    ///     CounterIntent::Increment => Duration::from_millis(10),
    /// });
    /// ```
    pub struct DelayedInterpreter<N, F> {
        inner: N,
        delay: F,
    }

    impl<N, F> DelayedInterpreter<N, F>
    where
        N: Interpreter,
        F: Fn(&N::Intent) -> Duration + Send + Sync,
    {
        /// Wrap `inner`, delaying each intent by `delay(&intent)`
        #[must_use]
        pub const fn new(inner: N, delay: F) -> Self {
            Self { inner, delay }
        }
    }

    impl<N, F> Interpreter for DelayedInterpreter<N, F>
    where
        N: Interpreter,
        N::Intent: Send,
        F: Fn(&N::Intent) -> Duration + Send + Sync,
    {
        type Intent = N::Intent;
        type Action = N::Action;

        fn interpret(
            &self,
            intent: Self::Intent,
        ) -> BoxFuture<'_, Result<Self::Action, InterpretError>> {
            let delay = (self.delay)(&intent);
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                self.inner.interpret(intent).await
            })
        }
    }

    /// Shared log of the actions a [`RecordingReducer`] has applied
    #[derive(Debug)]
    pub struct ActionLog<A>(Arc<Mutex<Vec<A>>>);

    impl<A> Clone for ActionLog<A> {
        fn clone(&self) -> Self {
            Self(Arc::clone(&self.0))
        }
    }

    impl<A: Clone> ActionLog<A> {
        /// Actions applied so far, in application order
        #[must_use]
        pub fn snapshot(&self) -> Vec<A> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Number of actions applied so far
        #[must_use]
        pub fn len(&self) -> usize {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Whether no action has been applied yet
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    /// Reducer wrapper that records every action before delegating
    pub struct RecordingReducer<R>
    where
        R: Reducer,
    {
        inner: R,
        log: ActionLog<R::Action>,
    }

    impl<R> RecordingReducer<R>
    where
        R: Reducer,
        R::Action: Clone,
    {
        /// Wrap `inner`
        #[must_use]
        pub fn new(inner: R) -> Self {
            Self {
                inner,
                log: ActionLog(Arc::new(Mutex::new(Vec::new()))),
            }
        }

        /// Handle to the action log, usable after the reducer moved into a store
        #[must_use]
        pub fn log(&self) -> ActionLog<R::Action> {
            self.log.clone()
        }
    }

    impl<R> Reducer for RecordingReducer<R>
    where
        R: Reducer,
        R::Action: Clone + Send,
    {
        type State = R::State;
        type Action = R::Action;

        fn reduce(&self, state: &Self::State, action: Self::Action) -> Self::State {
            self.log
                .0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(action.clone());
            self.inner.reduce(state, action)
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use mvi_store_runtime::{StateObserver, StoreError};
    use std::time::Duration;

    /// Pull `count` states from an observer
    ///
    /// The first state is the replayed latest one. Observation is conflated,
    /// so only ask for states you know will be distinct and awaited.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: fewer than `count` states arrived in time
    /// - [`StoreError::Stopped`]: the store stopped first
    pub async fn collect_states<S>(
        observer: &mut StateObserver<S>,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<S>, StoreError>
    where
        S: Clone + Send + Sync + 'static,
    {
        tokio::time::timeout(timeout, async {
            let mut states = Vec::with_capacity(count);
            while states.len() < count {
                match observer.next().await {
                    Some(state) => states.push(state),
                    None => return Err(StoreError::Stopped),
                }
            }
            Ok(states)
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG`. Safe to call from every test; only the first call
    /// installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{ActionLog, DelayedInterpreter, RecordingReducer};
pub use reducer_test::{InterpreterTest, ReducerTest};
