//! End-to-end dispatch scenarios against the in-memory queue.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use spindle_core::app::{CycleOutcome, DispatchError, DispatchLoop};
use spindle_core::domain::{Envelope, HandlerError, MessageId, MessageType, QueueEvent};
use spindle_core::impls::{BoundedExecutor, InMemoryQueue, RecordingEventSink};
use spindle_core::ports::{BoxTask, Executor, ExecutorError, MessageQueue};
use spindle_core::typed::{DynHandler, Handler, HandlerRegistry, Message};
use spindle_core::QueueConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Simple {
    value: i32,
}

impl Message for Simple {
    const TYPE: &'static str = "scenario.simple.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Parent {
    Child { note: String },
    Sibling,
}

impl Message for Parent {
    const TYPE: &'static str = "scenario.parent.v1";

    fn message_type(&self) -> MessageType {
        match self {
            Parent::Child { .. } => MessageType::new("scenario.parent.child.v1"),
            Parent::Sibling => MessageType::new("scenario.parent.sibling.v1"),
        }
    }

    fn families(&self) -> Vec<MessageType> {
        vec![MessageType::new(Self::TYPE)]
    }
}

/// Records every message it sees; fails while `fail` is set.
struct Recorder<M> {
    seen: Arc<Mutex<Vec<M>>>,
    fail: AtomicBool,
}

impl<M> Recorder<M> {
    fn new() -> (Self, Arc<Mutex<Vec<M>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Self {
            seen: Arc::clone(&seen),
            fail: AtomicBool::new(false),
        };
        (recorder, seen)
    }

    fn failing() -> (Self, Arc<Mutex<Vec<M>>>) {
        let (recorder, seen) = Self::new();
        recorder.fail.store(true, Ordering::SeqCst);
        (recorder, seen)
    }
}

#[async_trait]
impl<M: Message> Handler<M> for Recorder<M> {
    async fn handle(&self, message: M) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(message);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HandlerError::failed("boom"));
        }
        Ok(())
    }
}

/// Untyped handler declared for a single variant type; only counts calls.
struct VariantCounter {
    declared: MessageType,
    calls: AtomicUsize,
}

impl VariantCounter {
    fn new(declared: &str) -> Arc<Self> {
        Arc::new(Self {
            declared: MessageType::new(declared),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DynHandler for VariantCounter {
    fn declared_type(&self) -> &MessageType {
        &self.declared
    }

    async fn handle_dyn(&self, _envelope: &Envelope) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    queue: Arc<InMemoryQueue>,
    events: Arc<RecordingEventSink>,
}

impl Harness {
    fn new() -> Self {
        let events = Arc::new(RecordingEventSink::new());
        let queue = Arc::new(InMemoryQueue::new(&QueueConfig::default(), events.clone()));
        Self { queue, events }
    }

    fn dispatch(&self, registry: HandlerRegistry, executor: Arc<dyn Executor>) -> DispatchLoop {
        DispatchLoop::new(self.queue.clone(), Arc::new(registry), executor)
            .with_event_sink(self.events.clone())
    }
}

#[tokio::test]
async fn exact_type_is_handled_and_acked_once() {
    let h = Harness::new();
    let (recorder, seen) = Recorder::<Simple>::new();
    let mut registry = HandlerRegistry::builder();
    registry.register::<Simple, _>(recorder).unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(BoundedExecutor::new(4)));

    h.queue.publish(&Simple { value: 42 }).await.unwrap();
    assert_eq!(dispatch.drive_cycle().await.unwrap(), CycleOutcome::Submitted);
    dispatch.drain().await;

    assert_eq!(seen.lock().unwrap().as_slice(), &[Simple { value: 42 }]);
    assert_eq!(h.events.count("message_acknowledged"), 1);
    assert_eq!(h.queue.counts().await.outstanding(), 0);
}

#[tokio::test]
async fn family_variant_goes_to_the_family_handler_only() {
    let h = Harness::new();
    let (simple, simple_seen) = Recorder::<Simple>::new();
    let (parent, parent_seen) = Recorder::<Parent>::new();
    let mut registry = HandlerRegistry::builder();
    registry
        .register::<Simple, _>(simple)
        .unwrap()
        .register::<Parent, _>(parent)
        .unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(BoundedExecutor::new(4)));

    let child = Parent::Child {
        note: "hello".into(),
    };
    h.queue.publish(&child).await.unwrap();
    dispatch.drive_cycle().await.unwrap();
    dispatch.drain().await;

    assert_eq!(parent_seen.lock().unwrap().as_slice(), &[child]);
    assert!(simple_seen.lock().unwrap().is_empty());
    assert_eq!(h.events.count("message_acknowledged"), 1);
}

#[tokio::test]
async fn sibling_variant_handler_is_never_invoked() {
    let h = Harness::new();
    let sibling = VariantCounter::new("scenario.parent.sibling.v1");
    let (parent, parent_seen) = Recorder::<Parent>::new();
    let mut registry = HandlerRegistry::builder();
    registry
        .register_dyn(sibling.clone())
        .unwrap()
        .register::<Parent, _>(parent)
        .unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(BoundedExecutor::new(4)));

    let child = Parent::Child { note: "c".into() };
    h.queue.publish(&child).await.unwrap();
    assert_eq!(dispatch.drive_cycle().await.unwrap(), CycleOutcome::Submitted);
    dispatch.drain().await;

    // sibling handler は先に登録されていても Child にはマッチしない
    assert_eq!(parent_seen.lock().unwrap().as_slice(), &[child]);
    assert_eq!(sibling.calls(), 0);
    assert_eq!(h.events.count("message_acknowledged"), 1);
}

#[tokio::test]
async fn unsupported_type_is_fatal_and_never_acked() {
    let h = Harness::new();
    let (recorder, seen) = Recorder::<Simple>::new();
    let mut registry = HandlerRegistry::builder();
    registry.register::<Simple, _>(recorder).unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(BoundedExecutor::new(4)));

    let unsupported = Envelope::new(
        MessageId::generate(),
        MessageType::new("scenario.unsupported.v1"),
        json!({ "anything": true }),
    );
    h.queue.push(unsupported.clone()).await.unwrap();

    let err = dispatch.drive_cycle().await.unwrap_err();
    match err {
        DispatchError::NoHandler {
            message_id,
            message_type,
        } => {
            assert_eq!(message_id, unsupported.message_id());
            assert_eq!(&message_type, unsupported.message_type());
        }
        other => panic!("unexpected error: {other}"),
    }
    dispatch.drain().await;

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(h.events.count("message_acknowledged"), 0);
    assert_eq!(h.queue.counts().await.in_flight, 1);
}

#[tokio::test]
async fn failing_handler_leaves_message_in_flight() {
    let h = Harness::new();
    let (recorder, seen) = Recorder::<Simple>::failing();
    let mut registry = HandlerRegistry::builder();
    registry.register::<Simple, _>(recorder).unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(BoundedExecutor::new(4)));

    h.queue.publish(&Simple { value: 1 }).await.unwrap();
    dispatch.drive_cycle().await.unwrap();
    dispatch.drain().await;

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(h.events.count("message_acknowledged"), 0);
    assert_eq!(h.queue.counts().await.in_flight, 1);
    assert_eq!(dispatch.stats().snapshot().handler_failures, 1);
}

/// Pool that never has room.
struct FullExecutor;

#[async_trait]
impl Executor for FullExecutor {
    fn has_capacity(&self) -> bool {
        false
    }

    fn submit(&self, _task: BoxTask) -> Result<(), ExecutorError> {
        Err(ExecutorError::Rejected)
    }
}

/// Pool that claims room but rejects the submit.
struct RacingExecutor;

#[async_trait]
impl Executor for RacingExecutor {
    fn has_capacity(&self) -> bool {
        true
    }

    fn submit(&self, _task: BoxTask) -> Result<(), ExecutorError> {
        Err(ExecutorError::Rejected)
    }
}

#[tokio::test]
async fn no_capacity_skips_poll_and_emits_one_event() {
    let h = Harness::new();
    let (recorder, seen) = Recorder::<Simple>::new();
    let mut registry = HandlerRegistry::builder();
    registry.register::<Simple, _>(recorder).unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(FullExecutor));

    h.queue.publish(&Simple { value: 1 }).await.unwrap();
    h.events.clear();

    assert_eq!(dispatch.drive_cycle().await.unwrap(), CycleOutcome::NoCapacity);

    assert_eq!(h.events.events(), vec![QueueEvent::NoHandlerCapacity]);
    assert_eq!(h.events.count("queue_polled"), 0);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(h.queue.counts().await.ready, 1);
}

#[tokio::test]
async fn rejected_submission_is_pushed_back_without_ack() {
    let h = Harness::new();
    let (recorder, seen) = Recorder::<Simple>::new();
    let mut registry = HandlerRegistry::builder();
    registry.register::<Simple, _>(recorder).unwrap();
    let dispatch = h.dispatch(registry.build(), Arc::new(RacingExecutor));

    let id = h.queue.publish(&Simple { value: 7 }).await.unwrap();
    assert_eq!(dispatch.drive_cycle().await.unwrap(), CycleOutcome::Requeued);

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(h.events.count("message_acknowledged"), 0);
    assert_eq!(h.events.count("message_pushed"), 2);
    assert_eq!(h.queue.counts().await.ready, 1);
    assert_eq!(h.queue.attempts(id).await, Some(0));
}

#[tokio::test]
async fn repeated_resolution_returns_the_cached_handler() {
    let (recorder, _seen) = Recorder::<Parent>::new();
    let mut builder = HandlerRegistry::builder();
    builder.register::<Parent, _>(recorder).unwrap();
    let registry = builder.build();

    let first = Envelope::encode(&Parent::Sibling).unwrap();
    let second = Envelope::encode(&Parent::Sibling).unwrap();
    let a = registry.resolve(&first).unwrap();
    let b = registry.resolve(&second).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.cached_len(), 1);
}
