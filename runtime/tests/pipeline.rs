//! Integration tests for the two-stage Store pipeline
//!
//! Ordering, replay and lifecycle properties checked end to end through the
//! public API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::StreamExt;
use mvi_store_core::BoxFuture;
use mvi_store_core::interpreter::{InterpretError, Interpreter};
use mvi_store_core::reducer::Reducer;
use mvi_store_runtime::{QueuePolicy, Store, StoreConfig, StoreError, StoreStatus};
use mvi_store_testing::helpers::{collect_states, init_test_tracing};
use mvi_store_testing::{DelayedInterpreter, RecordingReducer};
use proptest::prelude::*;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq)]
struct LedgerState {
    balance: i64,
    entries: Vec<u32>,
}

/// Deposit `amount` under ticket `id`, after `delay_ms` of "validation"
#[derive(Debug, Clone)]
struct Deposit {
    id: u32,
    amount: i64,
    delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
enum LedgerAction {
    Credit { id: u32, amount: i64 },
}

struct LedgerInterpreter;

impl Interpreter for LedgerInterpreter {
    type Intent = Deposit;
    type Action = LedgerAction;

    fn interpret(&self, intent: Deposit) -> BoxFuture<'_, Result<LedgerAction, InterpretError>> {
        Box::pin(async move {
            if intent.amount < 0 {
                return Err(InterpretError::failed(format!(
                    "negative deposit on ticket {}",
                    intent.id
                )));
            }
            Ok(LedgerAction::Credit {
                id: intent.id,
                amount: intent.amount,
            })
        })
    }
}

struct LedgerReducer;

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = LedgerAction;

    fn reduce(&self, state: &LedgerState, action: LedgerAction) -> LedgerState {
        match action {
            LedgerAction::Credit { id, amount } => {
                let mut entries = state.entries.clone();
                entries.push(id);
                LedgerState {
                    balance: state.balance + amount,
                    entries,
                }
            },
        }
    }
}

fn delayed_ledger() -> DelayedInterpreter<LedgerInterpreter, fn(&Deposit) -> Duration> {
    fn delay(deposit: &Deposit) -> Duration {
        Duration::from_millis(deposit.delay_ms)
    }
    DelayedInterpreter::new(LedgerInterpreter, delay as fn(&Deposit) -> Duration)
}

fn deposit(id: u32, amount: i64, delay_ms: u64) -> Deposit {
    Deposit {
        id,
        amount,
        delay_ms,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_fifo_with_uneven_interpretation() {
    init_test_tracing();
    let reducer = RecordingReducer::new(LedgerReducer);
    let log = reducer.log();
    let store = Store::new(LedgerState::default(), delayed_ledger(), reducer);

    store.submit(deposit(1, 10, 40));
    store.submit(deposit(2, 20, 0));
    store.submit(deposit(3, 30, 15));

    let state = store.settle(WAIT).await.unwrap();

    assert_eq!(state.entries, vec![1, 2, 3]);
    assert_eq!(state.balance, 60);
    assert_eq!(
        log.snapshot(),
        vec![
            LedgerAction::Credit { id: 1, amount: 10 },
            LedgerAction::Credit { id: 2, amount: 20 },
            LedgerAction::Credit { id: 3, amount: 30 },
        ]
    );
}

#[tokio::test]
async fn test_submit_never_waits_for_interpretation() {
    let store = Store::new(LedgerState::default(), delayed_ledger(), LedgerReducer);

    let started = std::time::Instant::now();
    for id in 0..20 {
        store.submit(deposit(id, 1, 50));
    }
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(store.pending(), 20);

    store.stop().await.unwrap();
}

#[tokio::test]
async fn test_late_subscriber_gets_latest_not_initial() {
    let store = Store::new(LedgerState::default(), LedgerInterpreter, LedgerReducer);

    for id in 0..4 {
        store.submit(deposit(id, 5, 0));
    }
    store.settle(WAIT).await.unwrap();

    let mut observer = store.observe();
    let states = collect_states(&mut observer, 1, WAIT).await.unwrap();
    assert_eq!(states[0].balance, 20);
}

#[tokio::test]
async fn test_stream_observer_sees_each_awaited_transition() {
    let store = Store::new(LedgerState::default(), LedgerInterpreter, LedgerReducer);
    let mut stream = Box::pin(store.observe().into_stream());

    assert_eq!(stream.next().await.unwrap().balance, 0);
    for expected in [1, 2, 3] {
        store.submit(deposit(expected, 1, 0));
        let state = tokio::time::timeout(WAIT, stream.next()).await.unwrap().unwrap();
        assert_eq!(state.balance, i64::from(expected));
    }

    store.stop().await.unwrap();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_rejected_deposit_does_not_block_later_ones() {
    let store = Store::new(LedgerState::default(), LedgerInterpreter, LedgerReducer);

    store.submit(deposit(1, 5, 0));
    store.submit(deposit(2, -5, 0));
    store.submit(deposit(3, 5, 0));

    let state = store.settle(WAIT).await.unwrap();
    assert_eq!(state.entries, vec![1, 3]);
    assert_eq!(state.balance, 10);
}

#[tokio::test]
async fn test_single_slot_lossy_queue_reproduces_drops() {
    let config = StoreConfig::default().with_queue_policy(QueuePolicy::drop_newest(1));
    let store = Store::with_config(LedgerState::default(), delayed_ledger(), LedgerReducer, config);

    let outcomes: Vec<_> = (0..5)
        .map(|id| store.try_submit(deposit(id, 1, 10)))
        .collect();

    assert_eq!(outcomes[0], Ok(()));
    assert!(outcomes[1..].iter().all(|o| *o == Err(StoreError::QueueFull)));

    let state = store.settle(WAIT).await.unwrap();
    assert_eq!(state.entries, vec![0]);
}

#[tokio::test]
async fn test_stop_times_out_on_slow_wind_down() {
    // A zero timeout cannot wait for a stage that still needs to be polled
    let config = StoreConfig::default().with_stop_timeout(Duration::ZERO);
    let store = Store::with_config(LedgerState::default(), LedgerInterpreter, LedgerReducer, config);

    let outcome = store.stop().await;
    assert!(matches!(outcome, Ok(()) | Err(StoreError::StopTimeout(_))));
    assert_eq!(store.status(), StoreStatus::Stopped);
}

#[tokio::test]
async fn test_dropping_last_handle_releases_stages() {
    let store = Store::new(LedgerState::default(), delayed_ledger(), LedgerReducer);
    let mut transitions = store.subscribe_transitions();
    let mut observer = store.observe();
    observer.next().await.unwrap();

    store.submit(deposit(1, 1, 10_000));
    drop(store);

    // Both stages are aborted: the state cell closes and nothing is published
    let next = tokio::time::timeout(WAIT, observer.next()).await.unwrap();
    assert!(next.is_none());
    assert!(transitions.recv().await.is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_final_state_reflects_every_accepted_deposit(
        amounts in prop::collection::vec(0i64..1_000, 0..40),
    ) {
        let expected: i64 = amounts.iter().sum();
        let count = amounts.len();

        let state = tokio_test::block_on(async move {
            let store = Store::new(LedgerState::default(), LedgerInterpreter, LedgerReducer);
            for (id, amount) in amounts.into_iter().enumerate() {
                store.submit(deposit(u32::try_from(id).unwrap(), amount, 0));
            }
            store.settle(WAIT).await.unwrap()
        });

        prop_assert_eq!(state.balance, expected);
        prop_assert_eq!(state.entries.len(), count);
    }

    #[test]
    fn prop_fifo_survives_random_delays(
        delays in prop::collection::vec(0u64..5, 1..12),
    ) {
        let count = delays.len();

        let state = tokio_test::block_on(async move {
            let store = Store::new(LedgerState::default(), delayed_ledger(), LedgerReducer);
            for (id, delay_ms) in delays.into_iter().enumerate() {
                store.submit(deposit(u32::try_from(id).unwrap(), 1, delay_ms));
            }
            store.settle(WAIT).await.unwrap()
        });

        let expected: Vec<u32> = (0..u32::try_from(count).unwrap()).collect();
        prop_assert_eq!(state.entries, expected);
    }

    #[test]
    fn prop_transitions_are_monotonic(
        amounts in prop::collection::vec(0i64..100, 1..16),
    ) {
        let count = amounts.len();

        let balances = tokio_test::block_on(async move {
            let store = Store::new(LedgerState::default(), LedgerInterpreter, LedgerReducer);
            let mut rx = store.subscribe_transitions();
            for (id, amount) in amounts.into_iter().enumerate() {
                store.submit(deposit(u32::try_from(id).unwrap(), amount, 0));
            }
            let mut balances = Vec::new();
            for _ in 0..count {
                balances.push(rx.recv().await.unwrap().balance);
            }
            balances
        });

        prop_assert!(balances.windows(2).all(|w| w[0] <= w[1]));
    }
}
