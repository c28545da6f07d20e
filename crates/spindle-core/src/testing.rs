//! Test fixtures shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Envelope, HandlerError, MessageType};
use crate::typed::{DynHandler, Handler, Message};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simple {
    pub value: i32,
}

impl Message for Simple {
    const TYPE: &'static str = "test.simple.v1";
}

/// A sealed family with two variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parent {
    Child { note: String },
    Other { count: u32 },
}

impl Parent {
    pub const CHILD: &'static str = "test.parent.child.v1";
    pub const OTHER: &'static str = "test.parent.other.v1";
}

impl Message for Parent {
    const TYPE: &'static str = "test.parent.v1";

    fn message_type(&self) -> MessageType {
        match self {
            Parent::Child { .. } => MessageType::new(Self::CHILD),
            Parent::Other { .. } => MessageType::new(Self::OTHER),
        }
    }

    fn families(&self) -> Vec<MessageType> {
        vec![MessageType::new(Self::TYPE)]
    }
}

#[derive(Default)]
pub struct SimpleHandler {
    calls: Arc<Mutex<Vec<Simple>>>,
}

impl SimpleHandler {
    pub fn calls(&self) -> Arc<Mutex<Vec<Simple>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Handler<Simple> for SimpleHandler {
    async fn handle(&self, message: Simple) -> Result<(), HandlerError> {
        self.calls.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
pub struct ParentHandler {
    calls: Arc<Mutex<Vec<Parent>>>,
}

impl ParentHandler {
    pub fn calls(&self) -> Arc<Mutex<Vec<Parent>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Handler<Parent> for ParentHandler {
    async fn handle(&self, message: Parent) -> Result<(), HandlerError> {
        self.calls.lock().unwrap().push(message);
        Ok(())
    }
}

/// Untyped handler that counts calls and can be told to fail.
pub struct RecordingDynHandler {
    declared: MessageType,
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingDynHandler {
    pub fn new(declared: &str) -> Arc<Self> {
        Arc::new(Self {
            declared: MessageType::new(declared),
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing(declared: &str) -> Arc<Self> {
        Arc::new(Self {
            declared: MessageType::new(declared),
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DynHandler for RecordingDynHandler {
    fn declared_type(&self) -> &MessageType {
        &self.declared
    }

    async fn handle_dyn(&self, _envelope: &Envelope) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HandlerError::failed("intentional failure"));
        }
        Ok(())
    }
}
