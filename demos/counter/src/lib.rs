//! # Counter Example
//!
//! A single incrementing counter demonstrating the MVI store.
//!
//! This example showcases:
//! - A closed intent enum (`Increment`) and action enum (`IncrementBy`)
//! - An interpreter that turns taps into increments
//! - A pure reducer producing a new state per action
//! - Store usage: submit, observe, render
//!
//! ## Example
//!
//! ```no_run
//! use counter::{counter_store, render, CounterIntent};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), mvi_store_runtime::StoreError> {
//! let store = counter_store();
//!
//! store.submit(CounterIntent::Increment);
//! let state = store.wait_for(|s| s.value == 1, Duration::from_secs(1)).await?;
//! assert_eq!(render(&state), "1");
//! # Ok(())
//! # }
//! ```

use mvi_store_core::BoxFuture;
use mvi_store_core::interpreter::{InterpretError, Interpreter};
use mvi_store_core::reducer::Reducer;
use mvi_store_runtime::{Store, StoreConfig};

/// Counter state
///
/// Immutable: every transition builds a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count value
    pub value: i64,
}

impl CounterState {
    /// The state every counter starts from
    #[must_use]
    pub const fn initial() -> Self {
        Self { value: 0 }
    }
}

/// Counter intents
///
/// What the user can ask the counter to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterIntent {
    /// The increment button was tapped
    Increment,
}

/// Counter actions
///
/// What actually happens to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    /// Add the amount to the current value
    IncrementBy(i64),
}

/// Counter interpreter
///
/// Deterministic and infallible: one tap is one increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterInterpreter;

impl Interpreter for CounterInterpreter {
    type Intent = CounterIntent;
    type Action = CounterAction;

    fn interpret(
        &self,
        intent: Self::Intent,
    ) -> BoxFuture<'_, Result<Self::Action, InterpretError>> {
        Box::pin(async move {
            match intent {
                CounterIntent::Increment => Ok(CounterAction::IncrementBy(1)),
            }
        })
    }
}

/// Counter reducer
///
/// Pure: `IncrementBy(n)` yields `value + n`, saturating at the `i64` bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;

    fn reduce(&self, state: &Self::State, action: Self::Action) -> Self::State {
        match action {
            CounterAction::IncrementBy(amount) => CounterState {
                value: state.value.saturating_add(amount),
            },
        }
    }
}

/// A store for the counter domain
pub type CounterStore = Store<CounterInterpreter, CounterReducer>;

/// Create a counter store at the initial state with default configuration
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
#[must_use]
pub fn counter_store() -> CounterStore {
    counter_store_with_config(StoreConfig::default())
}

/// Create a counter store at the initial state
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
#[must_use]
pub fn counter_store_with_config(config: StoreConfig) -> CounterStore {
    Store::with_config(
        CounterState::initial(),
        CounterInterpreter,
        CounterReducer,
        config,
    )
}

/// Text shown for a state
#[must_use]
pub fn render(state: &CounterState) -> String {
    state.value.to_string()
}
