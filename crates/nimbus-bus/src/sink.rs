//! The injected event sink.

use crate::events::StorageEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// A destination for committed `StorageEvent`s.
///
/// Implementations are expected to be cheap and non-blocking; `publish` is
/// called synchronously from the façade's commit path. A real deployment
/// implements this over its message-queue client (out of scope for the
/// core — see spec Non-goals) and enqueues rather than blocking.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: StorageEvent) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("event sink error: {0}")]
pub struct SinkError(pub String);

/// In-process broadcast sink. Default for single-node deployments and tests.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<StorageEvent>,
    published: AtomicU64,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for InMemoryEventBus {
    fn publish(&self, event: StorageEvent) -> Result<(), SinkError> {
        self.published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(receivers, "storage event published");
                Ok(())
            }
            Err(_) => {
                // No subscribers; not an error, the event is simply dropped.
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::Principal;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = InMemoryEventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(StorageEvent::AccountUpdated {
            account: Principal::new("alice"),
            at: 42,
        })
        .unwrap();
        let event = rx.recv().await.unwrap();
        match event {
            StorageEvent::AccountUpdated { at, .. } => assert_eq!(at, 42),
            _ => panic!("wrong event"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus = InMemoryEventBus::new();
        assert!(bus
            .publish(StorageEvent::AccountUpdated {
                account: Principal::new("alice"),
                at: 1
            })
            .is_ok());
        assert_eq!(bus.published_count(), 1);
    }
}
