//! Handler trait - processes messages of one declared type.
//!
//! - `Handler<M>`: typed surface, receives the decoded message
//! - `DynHandler`: object-safe surface the registry stores
//! - `TypedHandler<M, H>`: type erasure from the former to the latter

use std::marker::PhantomData;

use async_trait::async_trait;

use super::message::Message;
use crate::domain::{Envelope, HandlerError, MessageType};

/// Handles messages of type `M` (or any variant of the family `M` names).
///
/// # 使用例
/// ```ignore
/// struct SendReceipt;
///
/// #[async_trait]
/// impl Handler<Billing> for SendReceipt {
///     async fn handle(&self, message: Billing) -> Result<(), HandlerError> {
///         match message {
///             Billing::Paid { invoice } => mail(invoice).await,
///             Billing::Refunded { .. } => Ok(()),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M: Message>: Send + Sync {
    async fn handle(&self, message: M) -> Result<(), HandlerError>;
}

/// Object-safe handler bound to one declared message type.
#[async_trait]
pub trait DynHandler: Send + Sync {
    fn declared_type(&self) -> &MessageType;

    async fn handle_dyn(&self, envelope: &Envelope) -> Result<(), HandlerError>;
}

pub struct TypedHandler<M: Message, H: Handler<M>> {
    declared: MessageType,
    handler: H,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message, H: Handler<M>> TypedHandler<M, H> {
    pub fn new(handler: H) -> Self {
        Self {
            declared: MessageType::new(M::TYPE),
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M: Message, H: Handler<M>> DynHandler for TypedHandler<M, H> {
    fn declared_type(&self) -> &MessageType {
        &self.declared
    }

    async fn handle_dyn(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let message: M = serde_json::from_value(envelope.payload().clone()).map_err(|source| {
            HandlerError::Decode {
                message_type: envelope.message_type().clone(),
                source,
            }
        })?;
        self.handler.handle(message).await
    }
}
