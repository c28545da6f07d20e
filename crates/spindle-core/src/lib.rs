//! spindle-core
//!
//! Message dispatch with concurrency limits and type-hierarchy handler
//! resolution.
//!
//! # モジュール構成
//! - **domain**: MessageId, MessageType, Envelope, QueueEvent, HandlerError
//! - **ports**: 抽象化レイヤー（MessageQueue, Executor, Activator, EventSink）
//! - **typed**: 型付き Message API（Message trait, Handler trait, HandlerRegistry）
//! - **app**: AppBuilder, DispatchLoop, DispatchRunner
//! - **impls**: 実装（InMemoryQueue, BoundedExecutor, event sinks など）
//! - **config**: JSON で読む設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
mod testing;

pub use app::{App, AppBuilder, BuildError, CycleOutcome, DispatchError, DispatchLoop, DispatchRunner};
pub use config::{ConfigError, DispatchConfig, QueueConfig, SpindleConfig};
pub use domain::{Envelope, HandlerError, MessageId, MessageType, QueueEvent};
pub use typed::{Handler, HandlerRegistry, Message};
