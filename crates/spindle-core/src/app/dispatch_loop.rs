//! DispatchLoop - one bounded dispatch cycle.
//!
//! # フロー
//! 1. Activator が inactive なら何もしない
//! 2. Executor に空きがなければ `NoHandlerCapacity` を出して終わる（poll しない）
//! 3. MessageQueue::poll() を 1 回だけ
//! 4. HandlerRegistry で handler を解決
//! 5. Executor に submit（handler 成功時のみ ack）
//! 6. submit が拒否されたら push で差し戻す

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::stats::DispatchStats;
use crate::domain::{Envelope, MessageId, MessageType, QueueEvent};
use crate::impls::{AlwaysActive, NoopEventSink};
use crate::ports::{
    Ack, Activator, BoxTask, Delivery, EventSink, Executor, MessageQueue, QueueError,
};
use crate::typed::{DynHandler, HandlerRegistry};

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// This instance is not the active one; nothing was touched.
    Inactive,
    /// The pool was full; the queue was not polled.
    NoCapacity,
    /// Polled, nothing was ready.
    Idle,
    /// A handler task was started.
    Submitted,
    /// The pool rejected the task and the message was pushed back.
    Requeued,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered handler accepts this message type. The message is left
    /// unacknowledged; redelivery is up to the queue.
    #[error("no handler registered for {message_type} (message {message_id})")]
    NoHandler {
        message_id: MessageId,
        message_type: MessageType,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Drains at most one message per cycle into a bounded executor.
pub struct DispatchLoop {
    queue: Arc<dyn MessageQueue>,
    registry: Arc<HandlerRegistry>,
    executor: Arc<dyn Executor>,
    activator: Arc<dyn Activator>,
    events: Arc<dyn EventSink>,
    stats: Arc<DispatchStats>,
}

impl DispatchLoop {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        registry: Arc<HandlerRegistry>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            queue,
            registry,
            executor,
            activator: Arc::new(AlwaysActive),
            events: Arc::new(NoopEventSink),
            stats: Arc::new(DispatchStats::new()),
        }
    }

    pub fn with_activator(mut self, activator: Arc<dyn Activator>) -> Self {
        self.activator = activator;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Run one cycle.
    ///
    /// Returns once the handler task has been submitted (or the cycle ended
    /// earlier); it never waits for the handler to finish.
    pub async fn drive_cycle(&self) -> Result<CycleOutcome, DispatchError> {
        let result = self.cycle().await;
        self.stats.record_cycle(&result);
        result
    }

    /// Stop accepting handler tasks and wait for the running ones.
    pub async fn drain(&self) {
        self.executor.drain().await;
    }

    async fn cycle(&self) -> Result<CycleOutcome, DispatchError> {
        if !self.activator.is_active() {
            return Ok(CycleOutcome::Inactive);
        }

        // 容量がなければ queue には触らない
        if !self.executor.has_capacity() {
            self.events.emit(QueueEvent::NoHandlerCapacity);
            return Ok(CycleOutcome::NoCapacity);
        }

        let Some(Delivery { envelope, ack }) = self.queue.poll().await? else {
            return Ok(CycleOutcome::Idle);
        };

        let Some(handler) = self.registry.resolve(&envelope) else {
            // ack は呼ばずに捨てる
            return Err(DispatchError::NoHandler {
                message_id: envelope.message_id(),
                message_type: envelope.message_type().clone(),
            });
        };

        let task = handle_then_ack(handler, envelope.clone(), ack, Arc::clone(&self.stats));
        match self.executor.submit(task) {
            Ok(()) => {
                debug!(
                    message_id = %envelope.message_id(),
                    message_type = %envelope.message_type(),
                    "handler submitted"
                );
                Ok(CycleOutcome::Submitted)
            }
            Err(e) => {
                // capacity チェック後に埋まった: 想定内の競合なので差し戻す
                debug!(
                    message_id = %envelope.message_id(),
                    error = %e,
                    "submission rejected, pushing message back"
                );
                self.queue.push(envelope).await?;
                Ok(CycleOutcome::Requeued)
            }
        }
    }
}

fn handle_then_ack(
    handler: Arc<dyn DynHandler>,
    envelope: Envelope,
    ack: Ack,
    stats: Arc<DispatchStats>,
) -> BoxTask {
    Box::pin(async move {
        match handler.handle_dyn(&envelope).await {
            Ok(()) => {
                stats.inc_handled();
                if let Err(e) = ack.ack().await {
                    stats.inc_ack_failures();
                    warn!(
                        message_id = %envelope.message_id(),
                        error = %e,
                        "ack failed"
                    );
                }
            }
            Err(e) => {
                stats.inc_handler_failures();
                warn!(
                    message_id = %envelope.message_id(),
                    message_type = %envelope.message_type(),
                    error = %e,
                    "handler failed, message left unacknowledged"
                );
            }
        }
    })
}
