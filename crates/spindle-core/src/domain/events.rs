//! QueueEvent - observability signals for the message lifecycle.

use super::message::Envelope;

/// Signals describing state transitions of the queue and the dispatch loop.
///
/// These are emitted, never consumed, by the core. The dispatch loop emits
/// only [`QueueEvent::NoHandlerCapacity`]; everything else belongs to the queue
/// implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// The ready set was polled.
    QueuePolled,
    /// Expired leases and scheduled retries were swept.
    RetryCyclePolled,
    MessagePushed(Envelope),
    MessageAcknowledged,
    /// A lease expired and the message was scheduled for redelivery.
    MessageRetried,
    /// A message exhausted its attempts.
    MessageDead,
    /// A push for a message that is already waiting was ignored.
    MessageDuplicate(Envelope),
    /// The queue could not take its lock without blocking.
    LockFailed,
    /// The worker pool was full, so the cycle skipped polling.
    NoHandlerCapacity,
}

impl QueueEvent {
    /// Stable snake_case name, used for log fields and counters.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::QueuePolled => "queue_polled",
            QueueEvent::RetryCyclePolled => "retry_cycle_polled",
            QueueEvent::MessagePushed(_) => "message_pushed",
            QueueEvent::MessageAcknowledged => "message_acknowledged",
            QueueEvent::MessageRetried => "message_retried",
            QueueEvent::MessageDead => "message_dead",
            QueueEvent::MessageDuplicate(_) => "message_duplicate",
            QueueEvent::LockFailed => "lock_failed",
            QueueEvent::NoHandlerCapacity => "no_handler_capacity",
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            QueueEvent::MessagePushed(env) | QueueEvent::MessageDuplicate(env) => Some(env),
            _ => None,
        }
    }
}
