//! Message trait - ties a Rust type to its message type name.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Envelope, MessageId, MessageType};

/// A typed message.
///
/// `TYPE` is what a `Handler<Self>` is registered under. For a plain struct it
/// is also the runtime type of every value. For a sealed family (an enum whose
/// variants are the concrete messages), `TYPE` names the family and each value
/// reports its own variant type through [`Message::message_type`] while listing
/// the family in [`Message::families`].
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// #[serde(tag = "kind", rename_all = "snake_case")]
/// enum Billing {
///     Paid { invoice: u64 },
///     Refunded { invoice: u64 },
/// }
///
/// impl Message for Billing {
///     const TYPE: &'static str = "acme.billing.v1";
///
///     fn message_type(&self) -> MessageType {
///         match self {
///             Billing::Paid { .. } => MessageType::new("acme.billing.paid.v1"),
///             Billing::Refunded { .. } => MessageType::new("acme.billing.refunded.v1"),
///         }
///     }
///
///     fn families(&self) -> Vec<MessageType> {
///         vec![MessageType::new(Self::TYPE)]
///     }
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    fn message_type(&self) -> MessageType {
        MessageType::new(Self::TYPE)
    }

    /// Families this value satisfies besides its own type.
    fn families(&self) -> Vec<MessageType> {
        Vec::new()
    }
}

impl Envelope {
    /// Serialize `message` into a new envelope with a fresh id.
    pub fn encode<M: Message>(message: &M) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_value(message)?;
        let envelope = Envelope::new(MessageId::generate(), message.message_type(), payload);
        Ok(message
            .families()
            .into_iter()
            .fold(envelope, |env, family| env.with_family(family)))
    }
}
