//! # spindle CLI
//!
//! In-memory デモ:
//! - 設定の読み込みと検証
//! - demo handler の登録と起動時検証
//! - queue が空になるまで dispatch して graceful shutdown

mod cli;
mod demo;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use spindle_core::app::StatsSnapshot;
use spindle_core::impls::{InMemoryQueue, QueueCounts, TracingEventSink};
use spindle_core::{AppBuilder, Message, SpindleConfig};
use tracing::{info, warn};
use tracing_subscriber::Layer;

use cli::{Cli, LogFormat};
use demo::{DemoMessage, Greeting, GreetingHandler, OrderEvent, OrderHandler};

#[derive(Debug, Serialize)]
struct Report {
    published: u32,
    queue: QueueCounts,
    dispatch: StatsSnapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "spindle starting");

    let result = run(&cli).await;
    if let Err(ref e) = result {
        tracing::error!(error = %e, "run failed");
    }
    result
}

async fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SpindleConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => demo_config(),
    };

    let events = Arc::new(TracingEventSink);
    let queue = Arc::new(InMemoryQueue::new(&config.queue, events.clone()));

    let app = AppBuilder::new()
        .register::<Greeting, _>(GreetingHandler::new(cli.fail_every))?
        .register::<OrderEvent, _>(OrderHandler::new())?
        .expect_types(&[Greeting::TYPE, OrderEvent::TYPE])
        .with_config(config.dispatch.clone())
        .with_event_sink(events)
        .build(queue.clone())?;

    for i in 0..cli.messages {
        match demo::demo_message(i) {
            DemoMessage::Greeting(m) => queue.publish(&m).await?,
            DemoMessage::Order(m) => queue.publish(&m).await?,
        };
    }
    info!(messages = cli.messages, "demo messages published");

    let runner = app.start();
    let mut check = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, shutting down");
                break;
            }
            _ = check.tick() => {
                if queue.counts().await.outstanding() == 0 {
                    break;
                }
            }
        }
    }
    runner.shutdown_and_join().await;

    let report = Report {
        published: cli.messages,
        queue: queue.counts().await,
        dispatch: app.dispatch().stats().snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Short lease and backoff so failed demo messages come back quickly.
fn demo_config() -> SpindleConfig {
    let mut config = SpindleConfig::default();
    config.queue.visibility_timeout_ms = 300;
    config.queue.retry_base_delay_ms = 50;
    config
}

fn init_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = match cli.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(())
}
