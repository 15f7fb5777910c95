//! Store configuration.

use crate::queue::QueuePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a [`StoreConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for a `StoreConfig`
    #[error("Invalid store configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for Store instances
///
/// Every field is optional when deserializing; missing fields take their
/// default value.
///
/// # Example
///
/// ```
/// use mvi_store_runtime::{QueuePolicy, StoreConfig};
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_queue_policy(QueuePolicy::drop_newest(1))
///     .with_stop_timeout(Duration::from_secs(1));
///
/// let parsed = StoreConfig::from_json(
///     r#"{ "queue": { "kind": "drop_newest", "capacity": 1 }, "stop_timeout_ms": 1000 }"#,
/// ).unwrap();
///
/// assert_eq!(parsed, config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Buffering policy for both the intent and the action queue
    pub queue: QueuePolicy,
    /// Number of transitions buffered per `subscribe_transitions` receiver
    pub transition_capacity: usize,
    /// How long `stop()` waits for each stage to wind down
    #[serde(rename = "stop_timeout_ms", with = "duration_ms")]
    pub stop_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(queue: QueuePolicy, transition_capacity: usize, stop_timeout: Duration) -> Self {
        Self {
            queue,
            transition_capacity,
            stop_timeout,
        }
    }

    /// Parse a configuration from a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the queue policy
    #[must_use]
    pub const fn with_queue_policy(mut self, queue: QueuePolicy) -> Self {
        self.queue = queue;
        self
    }

    /// Set the transition broadcast capacity
    #[must_use]
    pub const fn with_transition_capacity(mut self, capacity: usize) -> Self {
        self.transition_capacity = capacity;
        self
    }

    /// Set the stop timeout
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            queue: QueuePolicy::Unbounded,
            transition_capacity: 16,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)] // u64 millis covers any sane timeout
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
