//! # MVI Store Core
//!
//! Core traits and types for the Model-View-Intent store.
//!
//! This crate provides the two pluggable halves of a unidirectional data flow:
//! interpreting what a caller *asked for* into what *changed*, and folding that
//! change into a new state.
//!
//! ## Core Concepts
//!
//! - **State**: Immutable snapshot of the observable condition of a feature
//! - **Intent**: Immutable request submitted from outside the store (e.g. a tap)
//! - **Action**: Immutable description of the effect to apply to state
//! - **Interpreter**: Possibly-async function `Intent → Action`
//! - **Reducer**: Pure function `(&State, Action) → State`
//!
//! ## Architecture Principles
//!
//! - Unidirectional Data Flow
//! - State is never mutated in place
//! - Closed sum types for intents and actions, matched exhaustively
//!
//! ## Example
//!
//! ```ignore
//! use mvi_store_core::{interpreter::*, reducer::Reducer, BoxFuture};
//!
//! #[derive(Clone, Debug)]
//! struct CounterState { value: i64 }
//!
//! enum CounterIntent { Increment }
//! enum CounterAction { IncrementBy(i64) }
//!
//! impl Interpreter for CounterInterpreter {
//!     type Intent = CounterIntent;
//!     type Action = CounterAction;
//!
//!     fn interpret(&self, intent: CounterIntent) -> BoxFuture<'_, Result<CounterAction, InterpretError>> {
//!         Box::pin(async move {
//!             match intent {
//!                 CounterIntent::Increment => Ok(CounterAction::IncrementBy(1)),
//!             }
//!         })
//!     }
//! }
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!
//!     fn reduce(&self, state: &CounterState, action: CounterAction) -> CounterState {
//!         match action {
//!             CounterAction::IncrementBy(n) => CounterState { value: state.value + n },
//!         }
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by [`interpreter::Interpreter::interpret`]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reducer module - Pure state transitions
///
/// Reducers are pure functions: `(&State, Action) → State`
///
/// They never touch the outside world, never fail, and never mutate the
/// state they are handed.
pub mod reducer {
    /// The Reducer trait - folds an action into a new state
    ///
    /// # Type Parameters
    ///
    /// - `State`: The immutable state this reducer produces
    /// - `Action`: The action type this reducer applies
    ///
    /// # Example
    ///
    /// ```
    /// use mvi_store_core::reducer::Reducer;
    ///
    /// #[derive(Clone, Debug, PartialEq)]
    /// struct Total(i64);
    ///
    /// enum TotalAction {
    ///     Add(i64),
    /// }
    ///
    /// struct TotalReducer;
    ///
    /// impl Reducer for TotalReducer {
    ///     type State = Total;
    ///     type Action = TotalAction;
    ///
    ///     fn reduce(&self, state: &Total, action: TotalAction) -> Total {
    ///         match action {
    ///             TotalAction::Add(n) => Total(state.0 + n),
    ///         }
    ///     }
    /// }
    ///
    /// let before = Total(1);
    /// let after = TotalReducer.reduce(&before, TotalAction::Add(2));
    /// assert_eq!(before, Total(1));
    /// assert_eq!(after, Total(3));
    /// ```
    pub trait Reducer: Send + Sync {
        /// The state type this reducer produces
        type State;

        /// The action type this reducer applies
        type Action;

        /// Produce the state that follows `state` once `action` is applied
        ///
        /// Must be deterministic and free of side effects. The store calls it
        /// from a single task, one action at a time, in production order.
        fn reduce(&self, state: &Self::State, action: Self::Action) -> Self::State;
    }
}

/// Interpreter module - Turning intents into actions
///
/// Interpretation is where asynchronous work lives (I/O, delays, lookups).
/// The store runs at most one interpretation at a time, in submission order.
pub mod interpreter {
    use super::BoxFuture;
    use thiserror::Error;

    /// Errors an interpreter can report for a single intent
    ///
    /// A failed interpretation discards its intent; the store keeps running
    /// and moves on to the next one.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum InterpretError {
        /// The intent could not be turned into an action
        #[error("Interpretation failed: {0}")]
        Failed(String),
    }

    impl InterpretError {
        /// Build an [`InterpretError::Failed`] from any message
        #[must_use]
        pub fn failed(message: impl Into<String>) -> Self {
            Self::Failed(message.into())
        }
    }

    /// The Interpreter trait - maps an intent to the action it causes
    ///
    /// # Dyn Compatibility
    ///
    /// This trait returns an explicit [`BoxFuture`] instead of using `async fn`
    /// so that interpreters can be stored as `Arc<dyn Interpreter<..>>`.
    ///
    /// # Example
    ///
    /// ```
    /// use mvi_store_core::BoxFuture;
    /// use mvi_store_core::interpreter::{InterpretError, Interpreter};
    ///
    /// enum Intent {
    ///     Double(i64),
    /// }
    ///
    /// #[derive(Debug, PartialEq)]
    /// enum Action {
    ///     Add(i64),
    /// }
    ///
    /// struct Doubler;
    ///
    /// impl Interpreter for Doubler {
    ///     type Intent = Intent;
    ///     type Action = Action;
    ///
    ///     fn interpret(&self, intent: Intent) -> BoxFuture<'_, Result<Action, InterpretError>> {
    ///         Box::pin(async move {
    ///             match intent {
    ///                 Intent::Double(n) => Ok(Action::Add(n * 2)),
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let action = tokio_test::block_on(Doubler.interpret(Intent::Double(4)));
    /// assert_eq!(action, Ok(Action::Add(8)));
    /// ```
    pub trait Interpreter: Send + Sync {
        /// The intent type this interpreter accepts
        type Intent;

        /// The action type this interpreter produces
        type Action;

        /// Interpret an intent into an action
        ///
        /// May suspend. The store awaits the returned future to completion
        /// before picking up the next intent.
        ///
        /// # Errors
        ///
        /// Returns [`InterpretError`] when the intent cannot be turned into an
        /// action. The intent is then discarded.
        fn interpret(
            &self,
            intent: Self::Intent,
        ) -> BoxFuture<'_, Result<Self::Action, InterpretError>>;
    }

    impl<T> Interpreter for std::sync::Arc<T>
    where
        T: Interpreter + ?Sized,
    {
        type Intent = T::Intent;
        type Action = T::Action;

        fn interpret(
            &self,
            intent: Self::Intent,
        ) -> BoxFuture<'_, Result<Self::Action, InterpretError>> {
            (**self).interpret(intent)
        }
    }
}
