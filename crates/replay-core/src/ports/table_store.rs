//! TableStore port - hosted backend のテーブル操作
//!
//! 各呼び出しは単体ではアトミックだが、呼び出しをまたぐトランザクションはない。
//! insert と delete は独立した 2 回の呼び出しになる。

use async_trait::async_trait;

use crate::domain::{LiveRecord, RecordId, StagingRecord};
use crate::error::StoreError;

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Up to `limit` rows of `table`, ascending by id.
    async fn select_oldest(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<Vec<StagingRecord>, StoreError>;

    /// Bulk insert as one call.
    async fn insert(&self, table: &str, rows: &[LiveRecord]) -> Result<(), StoreError>;

    /// Delete exactly the rows whose id is in `ids`, as one call.
    async fn delete_ids(&self, table: &str, ids: &[RecordId]) -> Result<(), StoreError>;
}
