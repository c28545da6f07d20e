//! Demo messages and handlers.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spindle_core::{Handler, HandlerError, Message, MessageType};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Greeting {
    pub seq: u32,
    pub name: String,
}

impl Message for Greeting {
    const TYPE: &'static str = "demo.greeting.v1";
}

/// A small sealed family; handled as a whole by [`OrderHandler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: u32, amount: u64 },
    Cancelled { order_id: u32 },
}

impl Message for OrderEvent {
    const TYPE: &'static str = "demo.order.v1";

    fn message_type(&self) -> MessageType {
        match self {
            OrderEvent::Placed { .. } => MessageType::new("demo.order.placed.v1"),
            OrderEvent::Cancelled { .. } => MessageType::new("demo.order.cancelled.v1"),
        }
    }

    fn families(&self) -> Vec<MessageType> {
        vec![MessageType::new(Self::TYPE)]
    }
}

/// Fails every `fail_every`-th greeting once, so the queue has to redeliver it.
pub struct GreetingHandler {
    fail_every: u32,
    failed_once: Mutex<HashSet<u32>>,
}

impl GreetingHandler {
    pub fn new(fail_every: u32) -> Self {
        Self {
            fail_every,
            failed_once: Mutex::new(HashSet::new()),
        }
    }

    fn should_fail(&self, seq: u32) -> bool {
        if self.fail_every == 0 || seq % self.fail_every != 0 {
            return false;
        }
        match self.failed_once.lock() {
            Ok(mut seen) => seen.insert(seq),
            Err(poisoned) => poisoned.into_inner().insert(seq),
        }
    }
}

#[async_trait]
impl Handler<Greeting> for GreetingHandler {
    async fn handle(&self, message: Greeting) -> Result<(), HandlerError> {
        if self.should_fail(message.seq) {
            return Err(HandlerError::failed(format!(
                "transient failure for greeting #{}",
                message.seq
            )));
        }
        info!(seq = message.seq, name = %message.name, "hello");
        Ok(())
    }
}

#[derive(Default)]
pub struct OrderHandler {
    revenue: AtomicU64,
}

impl OrderHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Handler<OrderEvent> for OrderHandler {
    async fn handle(&self, message: OrderEvent) -> Result<(), HandlerError> {
        match message {
            OrderEvent::Placed { order_id, amount } => {
                let total = self.revenue.fetch_add(amount, Ordering::Relaxed) + amount;
                info!(order_id, amount, total, "order placed");
            }
            OrderEvent::Cancelled { order_id } => info!(order_id, "order cancelled"),
        }
        Ok(())
    }
}

/// Demo message for slot `i`: greetings and order events interleaved.
pub enum DemoMessage {
    Greeting(Greeting),
    Order(OrderEvent),
}

pub fn demo_message(i: u32) -> DemoMessage {
    match i % 3 {
        0 => DemoMessage::Order(OrderEvent::Placed {
            order_id: i,
            amount: u64::from(i) * 100,
        }),
        1 => DemoMessage::Greeting(Greeting {
            seq: i,
            name: format!("user-{i}"),
        }),
        _ => DemoMessage::Order(OrderEvent::Cancelled { order_id: i - 1 }),
    }
}
