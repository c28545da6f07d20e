//! Errors raised by message handlers.

use super::message::MessageType;

/// Failure reported by a handler.
///
/// The dispatch core never retries: a failed message is simply not
/// acknowledged, and the queue's own redelivery decides what happens next.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("failed to decode payload as {message_type}: {source}")]
    Decode {
        message_type: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
