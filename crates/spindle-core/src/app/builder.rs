//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_types()` で期待される message_type を宣言
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」と config をチェック
//! - 不足があれば `BuildError` を返す（起動後に NoHandler で気づくより早い）

use std::sync::Arc;

use tracing::info;

use super::dispatch_loop::DispatchLoop;
use super::runner::DispatchRunner;
use crate::config::{ConfigError, DispatchConfig};
use crate::impls::{AlwaysActive, BoundedExecutor, NoopEventSink};
use crate::ports::{Activator, EventSink, MessageQueue};
use crate::typed::{Handler, HandlerRegistryBuilder, Message, RegistryError};

/// Wires handlers, the queue and a bounded executor into an [`App`].
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .register::<OrderPlaced, _>(OrderPlacedHandler)?
///     .expect_types(&[OrderPlaced::TYPE])
///     .build(queue)?;
/// let runner = app.start();
/// ```
pub struct AppBuilder {
    registry: HandlerRegistryBuilder,
    expected_types: Option<Vec<String>>,
    config: DispatchConfig,
    activator: Arc<dyn Activator>,
    events: Arc<dyn EventSink>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing message types: {0:?}. These types were expected but no handler declares them.")]
    MissingMessageTypes(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistryBuilder::new(),
            expected_types: None,
            config: DispatchConfig::default(),
            activator: Arc::new(AlwaysActive),
            events: Arc::new(NoopEventSink),
        }
    }

    /// Handler を登録
    pub fn register<M: Message, H: Handler<M> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<M, H>(handler)?;
        Ok(self)
    }

    /// 期待される message_type のリストを設定
    pub fn expect_types(mut self, message_types: &[&str]) -> Self {
        self.expected_types = Some(message_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_activator(mut self, activator: Arc<dyn Activator>) -> Self {
        self.activator = activator;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn build(self, queue: Arc<dyn MessageQueue>) -> Result<App, BuildError> {
        self.config.validate()?;

        if let Some(expected) = &self.expected_types {
            let declared: Vec<String> = self
                .registry
                .declared_types()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            let missing: Vec<String> = expected
                .iter()
                .filter(|x| !declared.contains(x))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingMessageTypes(missing));
            }
        }

        let registry = Arc::new(self.registry.build());
        info!(
            handlers = registry.len(),
            pool_size = self.config.pool_size,
            "app built"
        );

        let dispatch = DispatchLoop::new(
            queue,
            registry,
            Arc::new(BoundedExecutor::new(self.config.pool_size)),
        )
        .with_activator(self.activator)
        .with_event_sink(self.events);

        Ok(App {
            dispatch: Arc::new(dispatch),
            config: self.config,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired dispatch loop, ready to be driven by hand or by a runner.
pub struct App {
    dispatch: Arc<DispatchLoop>,
    config: DispatchConfig,
}

impl App {
    pub fn dispatch(&self) -> &Arc<DispatchLoop> {
        &self.dispatch
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Spawn the periodic trigger.
    pub fn start(&self) -> DispatchRunner {
        DispatchRunner::spawn(Arc::clone(&self.dispatch), self.config.poll_interval())
    }
}
