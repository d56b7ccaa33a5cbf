//! ReplayLoopBuilder - ReplayLoop の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - store が未設定なら build() 時に BuildError を返す
//! - clock と run_id は省略時に SystemClock / 新しい RunId を使う

use super::replay_loop::{ReplayLoop, ReplaySettings};
use crate::domain::RunId;
use crate::ports::{Clock, SystemClock, TableStore};

/// BuildError はループ構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no table store configured; call .store() before .build()")]
    MissingStore,
}

/// # 使用例
/// ```ignore
/// let replay = ReplayLoopBuilder::new(config.replay_settings())
///     .store(PostgrestStore::new(&url, key, timeout)?)
///     .build()?;
/// let summary = replay.run().await?;
/// ```
pub struct ReplayLoopBuilder {
    settings: ReplaySettings,
    store: Option<Box<dyn TableStore>>,
    clock: Option<Box<dyn Clock>>,
    run_id: Option<RunId>,
}

impl ReplayLoopBuilder {
    pub fn new(settings: ReplaySettings) -> Self {
        Self {
            settings,
            store: None,
            clock: None,
            run_id: None,
        }
    }

    pub fn store(mut self, store: impl TableStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn build(self) -> Result<ReplayLoop, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        let run_id = self.run_id.unwrap_or_else(RunId::generate);
        Ok(ReplayLoop::new(run_id, store, clock, self.settings))
    }
}
