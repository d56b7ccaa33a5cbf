//! In-memory table store.
//!
//! staging テーブルは id 順の BTreeMap、live テーブルは挿入順の Vec。
//! 操作ごとに 1 回だけ失敗させる仕掛けと、呼び出し履歴を持つ。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{LiveRecord, RecordId, StagingRecord};
use crate::error::{Operation, StoreError};
use crate::ports::TableStore;

/// One backend call as observed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Select { table: String, limit: usize },
    Insert { table: String, rows: usize },
    Delete { table: String, ids: Vec<RecordId> },
}

#[derive(Default)]
struct InMemoryState {
    staging: HashMap<String, BTreeMap<RecordId, StagingRecord>>,
    live: HashMap<String, Vec<LiveRecord>>,
    fail_next: HashSet<Operation>,
    calls: Vec<StoreCall>,
}

impl InMemoryState {
    fn take_failure(&mut self, op: Operation) -> Result<(), StoreError> {
        if self.fail_next.remove(&op) {
            return Err(StoreError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryTableStore {
    /// Store with one empty staging table and one empty live table.
    pub fn with_tables(staging: &str, live: &str) -> Self {
        let mut state = InMemoryState::default();
        state.staging.insert(staging.to_string(), BTreeMap::new());
        state.live.insert(live.to_string(), Vec::new());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Add rows to a staging table, creating it if needed.
    pub async fn seed_staging(&self, table: &str, rows: impl IntoIterator<Item = StagingRecord>) {
        let mut state = self.state.lock().await;
        let rows_by_id = state.staging.entry(table.to_string()).or_default();
        for row in rows {
            rows_by_id.insert(row.id, row);
        }
    }

    pub async fn staging_ids(&self, table: &str) -> Vec<RecordId> {
        let state = self.state.lock().await;
        state
            .staging
            .get(table)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }

    pub async fn live_rows(&self, table: &str) -> Vec<LiveRecord> {
        let state = self.state.lock().await;
        state.live.get(table).cloned().unwrap_or_default()
    }

    /// Make the next call of `op` fail once.
    pub async fn fail_next(&self, op: Operation) {
        self.state.lock().await.fail_next.insert(op);
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn select_oldest(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<Vec<StagingRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Select {
            table: table.to_string(),
            limit,
        });
        state.take_failure(Operation::Select)?;

        let rows = state
            .staging
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(rows.values().take(limit).cloned().collect())
    }

    async fn insert(&self, table: &str, rows: &[LiveRecord]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Insert {
            table: table.to_string(),
            rows: rows.len(),
        });
        state.take_failure(Operation::Insert)?;

        let live = state
            .live
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        live.extend_from_slice(rows);
        Ok(())
    }

    async fn delete_ids(&self, table: &str, ids: &[RecordId]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Delete {
            table: table.to_string(),
            ids: ids.to_vec(),
        });
        state.take_failure(Operation::Delete)?;

        let rows = state
            .staging
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }
}
