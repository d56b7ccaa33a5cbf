//! App - アプリケーション層
//!
//! ports を組み合わせて staging → live の移送ループを実装する。
//!
//! # 主要コンポーネント
//! - **ReplayLoopBuilder**: ループの構築とワイヤリング
//! - **ReplayLoop**: fetch → map → insert → delete → pace の繰り返し
//! - **Status**: 累計・レポート

pub mod builder;
pub mod replay_loop;
pub mod status;

pub use self::builder::{BuildError, ReplayLoopBuilder};
pub use self::replay_loop::{ReplayLoop, ReplaySettings, StepOutcome, pacing_delay};
pub use self::status::{IterationReport, MoveStats, RunSummary};
