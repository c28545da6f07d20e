//! EventSink implementations.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::domain::QueueEvent;
use crate::ports::EventSink;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: QueueEvent) {}
}

/// Writes events to the `tracing` subscriber.
///
/// Backpressure and loss-related events go out at `warn`, the rest at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: QueueEvent) {
        let message_id = event.envelope().map(|env| env.message_id().to_string());
        match &event {
            QueueEvent::NoHandlerCapacity | QueueEvent::LockFailed | QueueEvent::MessageDead => {
                warn!(event = event.name(), "queue event");
            }
            _ => debug!(event = event.name(), message_id = ?message_id, "queue event"),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueueEvent>> {
        // emit は panic しないので poison されても中身はそのまま使える
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.lock().clone()
    }

    /// Number of recorded events with the given [`QueueEvent::name`].
    pub fn count(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: QueueEvent) {
        self.lock().push(event);
    }
}

/// Forwards every event to each inner sink.
#[derive(Default, Clone)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: QueueEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
