//! Counter example binary
//!
//! Simulates a user tapping an increment button while a view renders every
//! state it observes.
//!
//! Environment:
//! - `RUST_LOG`: tracing filter (default `counter=debug,mvi_store_runtime=debug`)
//! - `MVI_STORE_CONFIG`: optional JSON `StoreConfig`, e.g.
//!   `{"queue": {"kind": "drop_newest", "capacity": 1}}`

use anyhow::Context;
use counter::{counter_store_with_config, render, CounterIntent};
use mvi_store_runtime::StoreConfig;
use mvi_store_runtime::metrics::MetricsServer;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,mvi_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsServer::new();
    metrics.start()?;

    let config = match std::env::var("MVI_STORE_CONFIG") {
        Ok(json) => StoreConfig::from_json(&json).context("MVI_STORE_CONFIG")?,
        Err(_) => StoreConfig::default(),
    };
    tracing::info!(?config, "Starting counter");

    println!("=== Counter Example: MVI Store ===\n");

    let store = counter_store_with_config(config);

    // The "view": renders every state it sees until the store stops
    let mut observer = store.observe();
    let view = tokio::spawn(async move {
        while let Some(state) = observer.next().await {
            println!("  [view] {}", render(&state));
        }
    });

    // Three taps, each awaited
    for expected in 1..=3 {
        println!("\n>>> Tap");
        store.submit(CounterIntent::Increment);
        store.wait_for(|s| s.value == expected, TIMEOUT).await?;
    }

    // A burst of taps without waiting in between
    println!("\n>>> Five quick taps");
    for _ in 0..5 {
        store.submit(CounterIntent::Increment);
    }
    let settled = store.settle(TIMEOUT).await?;
    println!("Count after burst: {}", render(&settled));

    // A late view starts from the latest state, not from zero
    let mut late = store.observe();
    if let Some(state) = late.next().await {
        println!("Late view first sees: {}", render(&state));
    }

    store.stop().await?;
    view.await?;

    let health = store.health();
    println!("\nStore health: {} ({:?})", health.status, health.message);

    if let Some(text) = metrics.render() {
        println!("\n=== Metrics ===\n{text}");
    }

    Ok(())
}
