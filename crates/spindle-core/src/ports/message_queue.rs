//! MessageQueue port - the durable queue the dispatch loop drains.
//!
//! Persistence, visibility timeouts, retry counting and dead-lettering all
//! live behind this trait. The dispatch loop only polls, acknowledges and
//! pushes back.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Envelope, MessageId};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue operation failed: {0}")]
    OperationFailed(String),

    #[error("lease for {0} is no longer held")]
    LeaseLost(MessageId),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Confirms that one delivered message was fully handled.
///
/// `ack` consumes the value, so a delivery can be acknowledged at most once.
/// Dropping it without calling `ack` leaves the message outstanding.
#[async_trait]
pub trait Acknowledge: Send {
    async fn ack(self: Box<Self>) -> Result<(), QueueError>;
}

pub type Ack = Box<dyn Acknowledge>;

/// Wrap a closure as an [`Acknowledge`].
///
/// Useful for queue adapters whose ack is a plain callback.
pub fn ack_fn<F>(f: F) -> Ack
where
    F: FnOnce() + Send + 'static,
{
    Box::new(FnAck(f))
}

struct FnAck<F>(F);

#[async_trait]
impl<F> Acknowledge for FnAck<F>
where
    F: FnOnce() + Send + 'static,
{
    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        (self.0)();
        Ok(())
    }
}

/// One message handed out by a poll, with the ack that settles it.
pub struct Delivery {
    pub envelope: Envelope,
    pub ack: Ack,
}

impl Delivery {
    pub fn new(envelope: Envelope, ack: Ack) -> Self {
        Self { envelope, ack }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Try to take one ready message.
    ///
    /// Must return promptly: `Ok(None)` when nothing is ready, never wait for
    /// a message to arrive.
    async fn poll(&self) -> Result<Option<Delivery>, QueueError>;

    /// Enqueue a message for (re)delivery.
    async fn push(&self, envelope: Envelope) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn ack_fn_runs_closure_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ack = ack_fn({
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        ack.ack().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_ack_does_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ack = ack_fn({
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        drop(ack);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
