//! EventSink port - where queue and dispatch events are published.

use crate::domain::QueueEvent;

/// Receives [`QueueEvent`]s.
///
/// `emit` is synchronous and is called while the queue may hold internal
/// locks, so implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: QueueEvent);
}
