//! App - アプリケーション層
//!
//! ports を組み合わせて dispatch のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: ハンドラ登録と起動時検証
//! - **DispatchLoop**: 1 サイクル分の poll → resolve → submit
//! - **DispatchRunner**: 周期トリガと graceful shutdown
//! - **DispatchStats**: カウンタ

pub mod builder;
pub mod dispatch_loop;
pub mod runner;
pub mod stats;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatch_loop::{CycleOutcome, DispatchError, DispatchLoop};
pub use self::runner::DispatchRunner;
pub use self::stats::{DispatchStats, StatsSnapshot};
