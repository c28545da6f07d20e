use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Runs the dispatcher against an in-memory queue filled with demo messages.
#[derive(Debug, Parser)]
#[command(name = "spindle", version, about)]
pub struct Cli {
    /// JSON config file. Demo defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of demo messages to enqueue.
    #[arg(short, long, default_value_t = 20)]
    pub messages: u32,

    /// Fail every n-th `Simple` message on its first delivery (0 = never).
    #[arg(long, default_value_t = 4)]
    pub fail_every: u32,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// -v debug, -vv trace. `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}
