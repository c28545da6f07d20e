//! MessageType and Envelope: the untyped shape of a message on the queue.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::MessageId;

/// Name of a concrete message type or of a message family.
///
/// # 命名規約
/// - `{namespace}.{name}.v{major}`
/// - family variants extend the family name: `billing.invoice.paid.v1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageType(String);

impl MessageType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A message as carried by the queue: id, runtime type, the families that type
/// belongs to, and the JSON payload handlers decode.
///
/// The families list replaces runtime type introspection. A variant of a sealed
/// family lists the family name here, so a handler declared for the family
/// matches every variant without knowing them individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    message_id: MessageId,
    message_type: MessageType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    families: Vec<MessageType>,
    payload: serde_json::Value,
}

impl Envelope {
    pub fn new(message_id: MessageId, message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_id,
            message_type,
            families: Vec::new(),
            payload,
        }
    }

    /// Declare that this message also satisfies `family`.
    pub fn with_family(mut self, family: MessageType) -> Self {
        if family != self.message_type && !self.families.contains(&family) {
            self.families.push(family);
        }
        self
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    pub fn families(&self) -> &[MessageType] {
        &self.families
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// True if a handler declared for `declared` may receive this message:
    /// either the exact runtime type or one of its families.
    pub fn satisfies(&self, declared: &MessageType) -> bool {
        &self.message_type == declared || self.families.contains(declared)
    }
}
