//! InMemoryQueue - development queue with leases, retries and dead letters.
//!
//! # 状態遷移
//! - push → Ready
//! - poll → InFlight (lease token + visibility deadline)
//! - ack (same token) → removed
//! - lease expired → Scheduled (backoff) → Ready, or dead when attempts run out
//! - push while InFlight → Ready again (the outstanding ack becomes stale)

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::event_sinks::NoopEventSink;
use super::retry::RetryPolicy;
use crate::config::QueueConfig;
use crate::domain::{Envelope, MessageId, QueueEvent};
use crate::ports::{Acknowledge, Delivery, EventSink, MessageQueue, QueueError};
use crate::typed::Message;

/// Used when a configured delay would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline(now: Instant, after: Duration) -> Instant {
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ready,
    InFlight { token: u64, expires_at: Instant },
    Scheduled { run_at: Instant },
}

#[derive(Debug)]
struct Record {
    envelope: Envelope,
    /// Deliveries so far, including the current one while in flight.
    attempts: u32,
    slot: Slot,
}

/// Min-heap entry: earliest `run_at` first.
#[derive(Debug, PartialEq, Eq)]
struct ScheduledRedelivery {
    run_at: Instant,
    message_id: MessageId,
}

impl PartialOrd for ScheduledRedelivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledRedelivery {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .run_at
            .cmp(&self.run_at)
            .then_with(|| other.message_id.cmp(&self.message_id))
    }
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub ready: usize,
    pub in_flight: usize,
    pub scheduled: usize,
    pub dead: usize,
}

impl QueueCounts {
    /// Messages not yet acknowledged or dead.
    pub fn outstanding(&self) -> usize {
        self.ready + self.in_flight + self.scheduled
    }
}

struct QueueState {
    records: HashMap<MessageId, Record>,
    ready: VecDeque<MessageId>,
    scheduled: BinaryHeap<ScheduledRedelivery>,
    dead: Vec<Envelope>,
    next_token: u64,
}

impl QueueState {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            ready: VecDeque::new(),
            scheduled: BinaryHeap::new(),
            dead: Vec::new(),
            next_token: 0,
        }
    }

    fn push(&mut self, envelope: Envelope, events: &dyn EventSink) {
        let message_id = envelope.message_id();
        if let Some(record) = self.records.get_mut(&message_id) {
            match record.slot {
                Slot::InFlight { .. } => {
                    // 差し戻し: 今回の配送は試行回数に数えない
                    record.slot = Slot::Ready;
                    record.attempts = record.attempts.saturating_sub(1);
                    record.envelope = envelope.clone();
                    self.ready.push_back(message_id);
                    events.emit(QueueEvent::MessagePushed(envelope));
                }
                Slot::Ready | Slot::Scheduled { .. } => {
                    events.emit(QueueEvent::MessageDuplicate(envelope));
                }
            }
            return;
        }

        self.records.insert(
            message_id,
            Record {
                envelope: envelope.clone(),
                attempts: 0,
                slot: Slot::Ready,
            },
        );
        self.ready.push_back(message_id);
        events.emit(QueueEvent::MessagePushed(envelope));
    }

    /// Move expired leases to retry scheduling or to the dead list.
    fn reclaim_expired(
        &mut self,
        now: Instant,
        max_attempts: u32,
        retry_policy: &RetryPolicy,
        events: &dyn EventSink,
    ) {
        let expired: Vec<MessageId> = self
            .records
            .iter()
            .filter_map(|(id, record)| match record.slot {
                Slot::InFlight { expires_at, .. } if expires_at <= now => Some(*id),
                _ => None,
            })
            .collect();

        for message_id in expired {
            let Some(record) = self.records.get_mut(&message_id) else {
                continue;
            };

            if record.attempts >= max_attempts {
                if let Some(record) = self.records.remove(&message_id) {
                    debug!(%message_id, attempts = record.attempts, "message exhausted its attempts");
                    self.dead.push(record.envelope);
                    events.emit(QueueEvent::MessageDead);
                }
                continue;
            }

            let run_at = deadline(now, retry_policy.next_delay(record.attempts));
            record.slot = Slot::Scheduled { run_at };
            self.scheduled.push(ScheduledRedelivery { run_at, message_id });
            events.emit(QueueEvent::MessageRetried);
        }
    }

    fn promote_scheduled(&mut self, now: Instant) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.run_at > now {
                break;
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if let Some(record) = self.records.get_mut(&entry.message_id)
                && record.slot == (Slot::Scheduled { run_at: entry.run_at })
            {
                record.slot = Slot::Ready;
                self.ready.push_back(entry.message_id);
            }
        }
    }

    fn lease_next(
        &mut self,
        now: Instant,
        visibility_timeout: Duration,
    ) -> Option<(Envelope, MessageId, u64)> {
        while let Some(message_id) = self.ready.pop_front() {
            let Some(record) = self.records.get_mut(&message_id) else {
                continue;
            };
            if record.slot != Slot::Ready {
                continue;
            }
            self.next_token += 1;
            let token = self.next_token;
            record.attempts += 1;
            record.slot = Slot::InFlight {
                token,
                expires_at: deadline(now, visibility_timeout),
            };
            return Some((record.envelope.clone(), message_id, token));
        }
        None
    }

    fn ack(
        &mut self,
        message_id: MessageId,
        token: u64,
        events: &dyn EventSink,
    ) -> Result<(), QueueError> {
        let holds_lease = matches!(
            self.records.get(&message_id).map(|r| r.slot),
            Some(Slot::InFlight { token: current, .. }) if current == token
        );
        if !holds_lease {
            return Err(QueueError::LeaseLost(message_id));
        }
        self.records.remove(&message_id);
        events.emit(QueueEvent::MessageAcknowledged);
        Ok(())
    }

    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts {
            dead: self.dead.len(),
            ..QueueCounts::default()
        };
        for record in self.records.values() {
            match record.slot {
                Slot::Ready => counts.ready += 1,
                Slot::InFlight { .. } => counts.in_flight += 1,
                Slot::Scheduled { .. } => counts.scheduled += 1,
            }
        }
        counts
    }
}

/// In-process [`MessageQueue`] with lease-based redelivery.
///
/// A polled message stays leased for `visibility_timeout`. If it is not
/// acknowledged by then, the next poll schedules a redelivery using the retry
/// policy, or moves it to the dead list once `max_attempts` deliveries have
/// been made. Nothing is persisted.
pub struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
    events: Arc<dyn EventSink>,
    visibility_timeout: Duration,
    max_attempts: u32,
    retry_policy: RetryPolicy,
}

impl InMemoryQueue {
    pub fn new(config: &QueueConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::new())),
            events,
            visibility_timeout: config.visibility_timeout(),
            max_attempts: config.max_attempts.max(1),
            retry_policy: config.retry_policy(),
        }
    }

    /// Encode `message` and push it.
    pub async fn publish<M: Message>(&self, message: &M) -> Result<MessageId, QueueError> {
        let envelope = Envelope::encode(message)?;
        let message_id = envelope.message_id();
        self.push(envelope).await?;
        Ok(message_id)
    }

    pub async fn counts(&self) -> QueueCounts {
        self.state.lock().await.counts()
    }

    pub async fn dead_letters(&self) -> Vec<Envelope> {
        self.state.lock().await.dead.clone()
    }

    /// Deliveries made so far for a message still on the queue.
    pub async fn attempts(&self, message_id: MessageId) -> Option<u32> {
        let state = self.state.lock().await;
        state.records.get(&message_id).map(|r| r.attempts)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(&QueueConfig::default(), Arc::new(NoopEventSink))
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn poll(&self) -> Result<Option<Delivery>, QueueError> {
        // poll は待たない: ロックが取れなければ今回は諦める
        let Ok(mut state) = self.state.try_lock() else {
            self.events.emit(QueueEvent::LockFailed);
            return Ok(None);
        };

        let now = Instant::now();
        self.events.emit(QueueEvent::RetryCyclePolled);
        state.reclaim_expired(now, self.max_attempts, &self.retry_policy, self.events.as_ref());
        state.promote_scheduled(now);

        self.events.emit(QueueEvent::QueuePolled);
        let Some((envelope, message_id, token)) = state.lease_next(now, self.visibility_timeout)
        else {
            return Ok(None);
        };
        debug!(%message_id, token, "message leased");

        let ack = InMemoryAck {
            state: Arc::clone(&self.state),
            events: Arc::clone(&self.events),
            message_id,
            token,
        };
        Ok(Some(Delivery::new(envelope, Box::new(ack))))
    }

    async fn push(&self, envelope: Envelope) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.push(envelope, self.events.as_ref());
        Ok(())
    }
}

/// Ack for one lease. Stale once the lease expires or the message is pushed back.
struct InMemoryAck {
    state: Arc<Mutex<QueueState>>,
    events: Arc<dyn EventSink>,
    message_id: MessageId,
    token: u64,
}

#[async_trait]
impl Acknowledge for InMemoryAck {
    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.ack(self.message_id, self.token, self.events.as_ref())
    }
}
