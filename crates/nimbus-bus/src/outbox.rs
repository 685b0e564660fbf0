//! Per-transaction event accumulator.

use crate::events::StorageEvent;
use crate::sink::EventSink;
use std::sync::Arc;
use tracing::warn;

/// Collects events produced while a single façade operation runs, then ships
/// them to the injected sink on `flush` — which callers invoke only after
/// their underlying mutation has durably committed.
#[derive(Default)]
pub struct Outbox {
    pending: Vec<StorageEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: StorageEvent) {
        self.pending.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Ship every accumulated event to `sink`, best-effort. A publish failure
    /// is logged and otherwise swallowed: the outbox's contract ends at
    /// "the mutation this outbox belongs to already committed", so a sink
    /// outage must never surface as a façade error.
    pub fn flush(self, sink: &Arc<dyn EventSink>) {
        for event in self.pending {
            if let Err(err) = sink.publish(event) {
                warn!(error = %err, "event sink publish failed; event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryEventBus;
    use nimbus_types::Principal;

    #[test]
    fn flush_ships_all_events_in_order() {
        let bus = Arc::new(InMemoryEventBus::new());
        let sink: Arc<dyn EventSink> = bus.clone();
        let mut outbox = Outbox::new();
        outbox.push(StorageEvent::AccountUpdated {
            account: Principal::new("alice"),
            at: 1,
        });
        outbox.push(StorageEvent::AccountUpdated {
            account: Principal::new("alice"),
            at: 2,
        });
        assert_eq!(outbox.len(), 2);
        outbox.flush(&sink);
        assert_eq!(bus.published_count(), 2);
    }

    #[test]
    fn empty_outbox_flushes_nothing() {
        let bus = Arc::new(InMemoryEventBus::new());
        let sink: Arc<dyn EventSink> = bus.clone();
        Outbox::new().flush(&sink);
        assert_eq!(bus.published_count(), 0);
    }
}
