//! Health reporting for stores.

use crate::store::StoreStatus;

/// Overall health of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    /// Running, every interpretation succeeded so far
    Healthy,
    /// Running, but some intents were discarded by their interpreter
    Degraded,
    /// Stopped or crashed
    Unhealthy,
}

impl HealthStatus {
    /// `true` for [`HealthStatus::Healthy`]
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// `true` for [`HealthStatus::Unhealthy`]
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Point-in-time health of a store, see [`crate::Store::health`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Verdict derived from the fields below
    pub status: HealthStatus,
    /// Why the store is not healthy
    pub message: Option<String>,
    /// Lifecycle at the time of the check
    pub store_status: StoreStatus,
    /// Intents accepted but not yet fully processed
    pub pending: usize,
    /// Intents discarded because their interpretation failed
    pub interpret_failures: u64,
}

impl HealthCheck {
    /// Derive the verdict from a store snapshot
    #[must_use]
    pub fn assess(store_status: StoreStatus, pending: usize, interpret_failures: u64) -> Self {
        let (status, message) = match store_status {
            StoreStatus::Running if interpret_failures == 0 => (HealthStatus::Healthy, None),
            StoreStatus::Running => (
                HealthStatus::Degraded,
                Some(format!("{interpret_failures} interpretations failed")),
            ),
            StoreStatus::Stopped => (HealthStatus::Unhealthy, Some("Store has been stopped".into())),
            StoreStatus::Failed => (
                HealthStatus::Unhealthy,
                Some("A pipeline stage crashed".into()),
            ),
        };

        Self {
            status,
            message,
            store_status,
            pending,
            interpret_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_without_failures_is_healthy() {
        let check = HealthCheck::assess(StoreStatus::Running, 3, 0);

        assert!(check.status.is_healthy());
        assert_eq!(check.message, None);
        assert_eq!(check.pending, 3);
    }

    #[test]
    fn interpretation_failures_degrade() {
        let check = HealthCheck::assess(StoreStatus::Running, 0, 2);

        assert_eq!(check.status, HealthStatus::Degraded);
        assert_eq!(check.message.as_deref(), Some("2 interpretations failed"));
    }

    #[test]
    fn stopped_or_failed_is_unhealthy() {
        // A stopped store is unhealthy regardless of its failure count
        assert!(HealthCheck::assess(StoreStatus::Stopped, 0, 5).status.is_unhealthy());
        assert!(HealthCheck::assess(StoreStatus::Failed, 1, 0).status.is_unhealthy());
    }

    #[test]
    fn status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Degraded.to_string(), "degraded");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }
}
