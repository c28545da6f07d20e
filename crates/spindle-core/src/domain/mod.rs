//! Domain model: message ids and types, envelopes, events, handler errors.

pub mod errors;
pub mod events;
pub mod ids;
pub mod message;

pub use self::errors::HandlerError;
pub use self::events::QueueEvent;
pub use self::ids::MessageId;
pub use self::message::{Envelope, MessageType};
