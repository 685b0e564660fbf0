//! # Event Bus and Outbox
//!
//! The storage façade does not call its change-notification sink directly:
//! it accumulates `StorageEvent`s in a per-transaction `Outbox` and only
//! hands them to the injected `EventSink` once the surrounding mutation has
//! committed (§5, "Event emission"). The sink is best-effort — a failed
//! `publish` never unwinds the transaction that produced the event.
//!
//! `InMemoryEventBus` is the default sink: an in-process broadcast channel,
//! the same `tokio::sync::broadcast` shape this workspace already uses for
//! its event bus. Message-queue shipping (AMQP, etc.) is an explicit
//! Non-goal; a real deployment plugs its own `EventSink` in.

pub mod events;
pub mod outbox;
pub mod sink;

pub use events::StorageEvent;
pub use outbox::Outbox;
pub use sink::{EventSink, InMemoryEventBus};
