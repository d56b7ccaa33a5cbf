//! Status - 移送の累計とレポート

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{RecordId, RunId};

/// Running totals of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveStats {
    pub moved: usize,
    pub batches: usize,
}

impl MoveStats {
    pub fn record_batch(&mut self, rows: usize) {
        self.moved += rows;
        self.batches += 1;
    }
}

/// What one successful iteration did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationReport {
    pub started_at: DateTime<Utc>,
    pub moved_ids: Vec<RecordId>,
    pub total_moved: usize,
}

/// Returned by `ReplayLoop::run` once staging is drained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub stats: MoveStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
