//! Impls - implementations of the ports.
//!
//! # 含まれる実装
//! - **InMemoryQueue**: 開発用のキュー（lease / retry / dead letter）
//! - **BoundedExecutor**: tokio 上の上限付きワーカープール
//! - **AlwaysActive / SwitchActivator**: activation gate
//! - **Noop / Tracing / Recording / Fanout EventSink**

pub mod activator;
pub mod bounded_executor;
pub mod event_sinks;
pub mod inmem_queue;
pub mod retry;

pub use self::activator::{AlwaysActive, SwitchActivator};
pub use self::bounded_executor::BoundedExecutor;
pub use self::event_sinks::{FanoutEventSink, NoopEventSink, RecordingEventSink, TracingEventSink};
pub use self::inmem_queue::{InMemoryQueue, QueueCounts};
pub use self::retry::RetryPolicy;
