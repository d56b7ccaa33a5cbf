//! Domain model (IDs, records, loop state).
//!
//! - **ids**: RecordId（staging の主キー）と RunId（ログ相関用）
//! - **record**: StagingRecord / LiveRecord とその変換
//! - **state**: ReplayLoop の状態（Running → Done）

pub mod ids;
pub mod record;
pub mod state;

pub use ids::{RecordId, RunId};
pub use record::{LiveRecord, NodeId, StagingRecord};
pub use state::LoopState;
