//! Ports - interfaces to the collaborators around the dispatch loop.
//!
//! The loop itself knows nothing about storage, threads or leader election;
//! it talks to these traits only. Implementations live in `impls`.

pub mod activator;
pub mod event_sink;
pub mod executor;
pub mod message_queue;

pub use self::activator::Activator;
pub use self::event_sink::EventSink;
pub use self::executor::{BoxTask, Executor, ExecutorError};
pub use self::message_queue::{Ack, Acknowledge, Delivery, MessageQueue, QueueError, ack_fn};
