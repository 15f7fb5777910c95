//! Stage queues between the caller, the interpretation stage and the
//! reduction stage.
//!
//! Both hops use the same [`QueuePolicy`]. The default never loses items;
//! [`QueuePolicy::DropNewest`] keeps a small bounded buffer and sheds whatever
//! arrives while it is full.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Buffering policy for the intent and action queues
///
/// # Example
///
/// ```
/// use mvi_store_runtime::QueuePolicy;
///
/// // Lossy single-slot buffer: a burst of submissions keeps only what fits
/// let lossy = QueuePolicy::drop_newest(1);
/// assert_eq!(lossy.capacity(), Some(1));
///
/// assert_eq!(QueuePolicy::default(), QueuePolicy::Unbounded);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Unbounded buffer: nothing is ever dropped and submission never blocks
    #[default]
    Unbounded,

    /// Bounded buffer: items offered while the buffer is full are dropped
    DropNewest {
        /// Number of items the buffer holds (clamped to at least 1)
        capacity: usize,
    },
}

impl QueuePolicy {
    /// Bounded, lossy policy with the given capacity
    #[must_use]
    pub const fn drop_newest(capacity: usize) -> Self {
        Self::DropNewest { capacity }
    }

    /// Effective buffer capacity, `None` when unbounded
    #[must_use]
    pub fn capacity(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::DropNewest { capacity } => Some(capacity.max(1)),
        }
    }
}

/// Why an item was not enqueued. The item is handed back.
#[derive(Debug)]
pub(crate) enum OfferError<T> {
    /// The bounded buffer is full
    Full(T),
    /// The consuming stage is gone
    Closed(T),
}

/// Producing half of a stage queue
pub(crate) enum QueueSender<T> {
    Unbounded(mpsc::UnboundedSender<T>),
    Bounded(mpsc::Sender<T>),
}

/// Consuming half of a stage queue
pub(crate) enum QueueReceiver<T> {
    Unbounded(mpsc::UnboundedReceiver<T>),
    Bounded(mpsc::Receiver<T>),
}

/// Create a queue following `policy`
pub(crate) fn channel<T>(policy: QueuePolicy) -> (QueueSender<T>, QueueReceiver<T>) {
    match policy.capacity() {
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
        },
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity);
            (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
        },
    }
}

impl<T> QueueSender<T> {
    /// Enqueue without waiting
    pub(crate) fn offer(&self, item: T) -> Result<(), OfferError<T>> {
        match self {
            Self::Unbounded(tx) => tx.send(item).map_err(|e| OfferError::Closed(e.0)),
            Self::Bounded(tx) => tx.try_send(item).map_err(|e| match e {
                mpsc::error::TrySendError::Full(item) => OfferError::Full(item),
                mpsc::error::TrySendError::Closed(item) => OfferError::Closed(item),
            }),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Next item in FIFO order, `None` once every sender is gone
    pub(crate) async fn recv(&mut self) -> Option<T> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_keeps_everything_in_order() {
        let (tx, mut rx) = channel(QueuePolicy::Unbounded);
        for i in 0..100 {
            tx.offer(i).unwrap();
        }
        drop(tx);

        let mut received = Vec::new();
        while let Some(i) = rx.recv().await {
            received.push(i);
        }
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn drop_newest_sheds_overflow() {
        let (tx, mut rx) = channel(QueuePolicy::drop_newest(1));

        tx.offer("first").unwrap();
        match tx.offer("second") {
            Err(OfferError::Full(item)) => assert_eq!(item, "second"),
            other => panic!("expected Full, got {other:?}"),
        }

        assert_eq!(rx.recv().await, Some("first"));
        tx.offer("third").unwrap();
        assert_eq!(rx.recv().await, Some("third"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(QueuePolicy::drop_newest(0).capacity(), Some(1));
        assert_eq!(QueuePolicy::Unbounded.capacity(), None);
    }

    #[test]
    fn offer_after_receiver_dropped_is_closed() {
        let (tx, rx) = channel::<u8>(QueuePolicy::Unbounded);
        drop(rx);
        assert!(matches!(tx.offer(1), Err(OfferError::Closed(1))));
    }

    #[test]
    fn policy_deserializes_from_json() {
        let policy: QueuePolicy =
            serde_json::from_str(r#"{ "kind": "drop_newest", "capacity": 1 }"#).unwrap();
        assert_eq!(policy, QueuePolicy::drop_newest(1));

        let policy: QueuePolicy = serde_json::from_str(r#"{ "kind": "unbounded" }"#).unwrap();
        assert_eq!(policy, QueuePolicy::Unbounded);
    }
}
