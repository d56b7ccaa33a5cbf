//! replay-core
//!
//! Moves rows from a staging table to a live table of a hosted backend,
//! oldest first, in fixed-size batches at a fixed cadence, until staging is empty.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, record, state）
//! - **ports**: 抽象化レイヤー（TableStore, Clock）
//! - **app**: アプリケーションロジック（builder, replay_loop, status）
//! - **impls**: 実装（PostgrestStore, InMemoryTableStore）
//! - **config**: 環境変数からの設定読み込み
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{ReplayLoop, ReplayLoopBuilder, ReplaySettings, RunSummary, StepOutcome};
pub use config::{ConfigError, ReplayConfig};
pub use error::{Operation, ReplayError, StoreError};
