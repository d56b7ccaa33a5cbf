//! ReplayLoop - staging → live の移送ループ
//!
//! # フロー（1 iteration）
//! 1. iteration 開始時刻を記録（ペーシング用）
//! 2. TableStore::select_oldest() で id 昇順に最大 batch_size 行を取得
//! 3. 0 行なら Done に遷移して終了
//! 4. 各行を LiveRecord に変換（id を落とす）
//! 5. TableStore::insert() で live にまとめて追加
//! 6. TableStore::delete_ids() で 2 で取得した id 集合だけを staging から削除
//! 7. 累計を更新して報告
//! 8. `max(0, interval - elapsed)` だけ sleep
//!
//! リトライはしない。どのエラーもそのまま呼び出し元に返す。

use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use super::status::{IterationReport, MoveStats, RunSummary};
use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_LIVE_TABLE, DEFAULT_SEND_INTERVAL_SECONDS, DEFAULT_STAGING_TABLE,
};
use crate::domain::{LiveRecord, LoopState, RecordId, RunId};
use crate::error::{Operation, ReplayError};
use crate::ports::{Clock, TableStore};

/// Knobs of one replay run. No cross-validation between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySettings {
    pub staging_table: String,
    pub live_table: String,
    pub interval: Duration,
    pub batch_size: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            staging_table: DEFAULT_STAGING_TABLE.to_string(),
            live_table: DEFAULT_LIVE_TABLE.to_string(),
            interval: Duration::from_secs(DEFAULT_SEND_INTERVAL_SECONDS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Result of a single `step()`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Moved(IterationReport),
    Drained,
}

/// How long to sleep after an iteration that took `elapsed`.
///
/// Overruns give zero: the next iteration starts right away, nothing is skipped.
pub fn pacing_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

pub struct ReplayLoop {
    run_id: RunId,
    store: Box<dyn TableStore>,
    clock: Box<dyn Clock>,
    settings: ReplaySettings,
    stats: MoveStats,
    state: LoopState,
}

impl ReplayLoop {
    pub(crate) fn new(
        run_id: RunId,
        store: Box<dyn TableStore>,
        clock: Box<dyn Clock>,
        settings: ReplaySettings,
    ) -> Self {
        Self {
            run_id,
            store,
            clock,
            settings,
            stats: MoveStats::default(),
            state: LoopState::Running,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> MoveStats {
        self.stats
    }

    pub fn settings(&self) -> &ReplaySettings {
        &self.settings
    }

    /// Run exactly one iteration, without pacing.
    ///
    /// Once the loop is `Done` this returns `Drained` and issues no backend calls.
    pub async fn step(&mut self) -> Result<StepOutcome, ReplayError> {
        if self.state.is_terminal() {
            return Ok(StepOutcome::Drained);
        }

        let started_at = self.clock.now();
        let staging = self.settings.staging_table.as_str();
        let live = self.settings.live_table.as_str();

        let batch = self
            .store
            .select_oldest(staging, self.settings.batch_size)
            .await
            .map_err(|e| ReplayError::store(Operation::Select, staging, e))?;

        self.state = self.state.after_fetch(batch.len());
        if batch.is_empty() {
            return Ok(StepOutcome::Drained);
        }

        // delete はこの id 集合だけに絞る（fetch 後に増えた行を消さないため）
        let ids: Vec<RecordId> = batch.iter().map(|r| r.id).collect();
        let rows: Vec<LiveRecord> = batch.iter().map(LiveRecord::from).collect();

        self.store
            .insert(live, &rows)
            .await
            .map_err(|e| ReplayError::store(Operation::Insert, live, e))?;

        if let Err(source) = self.store.delete_ids(staging, &ids).await {
            tracing::error!(
                ids = ?ids,
                error = %source,
                "rows inserted into {live} but not deleted from {staging}; they now exist in both tables"
            );
            return Err(ReplayError::PartialMove {
                staging: staging.to_string(),
                live: live.to_string(),
                pending_ids: ids,
                source,
            });
        }

        self.stats.record_batch(ids.len());
        tracing::info!(
            batch = ids.len(),
            total = self.stats.moved,
            "Sent {} rows | moved total={}",
            ids.len(),
            self.stats.moved
        );

        Ok(StepOutcome::Moved(IterationReport {
            started_at,
            moved_ids: ids,
            total_moved: self.stats.moved,
        }))
    }

    /// Drive the loop until staging is empty, pacing iterations to `interval`.
    ///
    /// Consumes the loop: the store (and its connections) is dropped on every return path.
    pub async fn run(self) -> Result<RunSummary, ReplayError> {
        let span = tracing::info_span!("replay", run_id = %self.run_id);
        self.drive().instrument(span).await
    }

    async fn drive(mut self) -> Result<RunSummary, ReplayError> {
        let started_at = self.clock.now();
        self.log_startup();

        while !self.state.is_terminal() {
            let tick = Instant::now();
            match self.step().await? {
                StepOutcome::Moved(_) => {
                    let delay = pacing_delay(self.settings.interval, tick.elapsed());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                StepOutcome::Drained => {
                    tracing::info!(total = self.stats.moved, "Staging empty. Finished");
                }
            }
        }

        Ok(RunSummary {
            run_id: self.run_id,
            stats: self.stats,
            started_at,
            finished_at: self.clock.now(),
        })
    }

    fn log_startup(&self) {
        let settings = &self.settings;
        let interval_secs = settings.interval.as_secs_f64();
        let cadence = if interval_secs > 0.0 {
            let sends_per_min = 60.0 / interval_secs;
            format!(
                "{sends_per_min:.2} sends/min, {:.2} rows/min",
                sends_per_min * settings.batch_size as f64
            )
        } else {
            "unpaced".to_string()
        };

        tracing::info!(
            staging = %settings.staging_table,
            live = %settings.live_table,
            batch_size = settings.batch_size,
            interval_secs,
            "Replay worker started | staging={} -> live={} | batch={} | interval={}s ({})",
            settings.staging_table,
            settings.live_table,
            settings.batch_size,
            interval_secs,
            cadence
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StagingRecord;
    use crate::error::StoreError;
    use crate::impls::{InMemoryTableStore, StoreCall};
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    const STAGING: &str = "staging";
    const LIVE: &str = "live";

    fn settings(batch_size: usize, interval_secs: u64) -> ReplaySettings {
        ReplaySettings {
            staging_table: STAGING.to_string(),
            live_table: LIVE.to_string(),
            interval: Duration::from_secs(interval_secs),
            batch_size,
        }
    }

    fn row(id: i64) -> StagingRecord {
        StagingRecord::new(RecordId::new(id), format!("node-{id}").as_str()).with_ph(7.0)
    }

    fn ids(values: &[i64]) -> Vec<RecordId> {
        values.iter().copied().map(RecordId::new).collect()
    }

    fn replay_loop(store: impl TableStore + 'static, settings: ReplaySettings) -> ReplayLoop {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
        ReplayLoop::new(RunId::generate(), Box::new(store), Box::new(clock), settings)
    }

    async fn seeded(rows: &[i64]) -> InMemoryTableStore {
        let store = InMemoryTableStore::with_tables(STAGING, LIVE);
        store.seed_staging(STAGING, rows.iter().copied().map(row)).await;
        store
    }

    #[rstest]
    #[case::under_interval(30, 4, 26)]
    #[case::exactly_interval(30, 30, 0)]
    #[case::overrun(30, 45, 0)]
    #[case::zero_interval(0, 1, 0)]
    fn pacing_never_goes_negative(
        #[case] interval: u64,
        #[case] elapsed: u64,
        #[case] expected: u64,
    ) {
        assert_eq!(
            pacing_delay(Duration::from_secs(interval), Duration::from_secs(elapsed)),
            Duration::from_secs(expected)
        );
    }

    #[rstest]
    #[case::batch_smaller_than_backlog(2, 5, 2)]
    #[case::batch_equal_to_backlog(3, 3, 3)]
    #[case::batch_larger_than_backlog(10, 4, 4)]
    #[tokio::test]
    async fn one_step_moves_min_of_batch_and_remaining(
        #[case] batch_size: usize,
        #[case] backlog: i64,
        #[case] expected: usize,
    ) {
        let backlog: Vec<i64> = (1..=backlog).collect();
        let store = seeded(&backlog).await;
        let mut replay = replay_loop(store.clone(), settings(batch_size, 30));

        let outcome = replay.step().await.unwrap();
        let StepOutcome::Moved(report) = outcome else {
            panic!("expected a moved batch");
        };

        let expected_ids: Vec<i64> = (1..=expected as i64).collect();
        assert_eq!(report.moved_ids, ids(&expected_ids));
        assert_eq!(store.live_rows(LIVE).await.len(), expected);
        assert_eq!(store.staging_ids(STAGING).await.len(), backlog.len() - expected);
        assert_eq!(replay.state(), LoopState::Running);
    }

    #[tokio::test]
    async fn empty_fetch_transitions_to_done_without_writes() {
        let store = seeded(&[]).await;
        let mut replay = replay_loop(store.clone(), settings(1, 30));

        assert_eq!(replay.step().await.unwrap(), StepOutcome::Drained);
        assert_eq!(replay.state(), LoopState::Done);

        // Done は終端: 以降の step は backend を呼ばない
        assert_eq!(replay.step().await.unwrap(), StepOutcome::Drained);
        assert_eq!(
            store.calls().await,
            vec![StoreCall::Select {
                table: STAGING.to_string(),
                limit: 1
            }]
        );
    }

    #[tokio::test]
    async fn select_failure_is_fatal_and_touches_nothing() {
        let store = seeded(&[1, 2]).await;
        store.fail_next(Operation::Select).await;
        let mut replay = replay_loop(store.clone(), settings(2, 30));

        let err = replay.step().await.unwrap_err();
        assert_eq!(err.operation(), Operation::Select);
        assert_eq!(store.staging_ids(STAGING).await, ids(&[1, 2]));
        assert!(store.live_rows(LIVE).await.is_empty());
    }

    #[tokio::test]
    async fn insert_failure_leaves_staging_intact() {
        let store = seeded(&[1, 2]).await;
        store.fail_next(Operation::Insert).await;
        let mut replay = replay_loop(store.clone(), settings(2, 30));

        let err = replay.step().await.unwrap_err();
        assert!(matches!(err, ReplayError::Store { op: Operation::Insert, .. }));
        assert_eq!(store.staging_ids(STAGING).await, ids(&[1, 2]));
        assert_eq!(replay.stats().moved, 0);
    }

    #[tokio::test]
    async fn delete_failure_after_insert_is_a_partial_move() {
        let store = seeded(&[1, 2, 3]).await;
        store.fail_next(Operation::Delete).await;
        let mut replay = replay_loop(store.clone(), settings(2, 30));

        let err = replay.step().await.unwrap_err();
        match err {
            ReplayError::PartialMove { pending_ids, .. } => assert_eq!(pending_ids, ids(&[1, 2])),
            other => panic!("unexpected error: {other}"),
        }
        // 既知のギャップ: 両方のテーブルに存在する
        assert_eq!(store.live_rows(LIVE).await.len(), 2);
        assert_eq!(store.staging_ids(STAGING).await, ids(&[1, 2, 3]));
        assert_eq!(replay.stats().moved, 0);
    }

    /// Simulates a producer appending to staging between fetch and delete.
    struct ConcurrentProducer {
        inner: InMemoryTableStore,
        next_id: i64,
    }

    #[async_trait]
    impl TableStore for ConcurrentProducer {
        async fn select_oldest(
            &self,
            table: &str,
            limit: usize,
        ) -> Result<Vec<StagingRecord>, StoreError> {
            self.inner.select_oldest(table, limit).await
        }

        async fn insert(&self, table: &str, rows: &[LiveRecord]) -> Result<(), StoreError> {
            self.inner.seed_staging(STAGING, [row(self.next_id)]).await;
            self.inner.insert(table, rows).await
        }

        async fn delete_ids(&self, table: &str, ids: &[RecordId]) -> Result<(), StoreError> {
            self.inner.delete_ids(table, ids).await
        }
    }

    #[tokio::test]
    async fn rows_arriving_mid_iteration_are_not_deleted() {
        let store = seeded(&[1, 2]).await;
        let producer = ConcurrentProducer {
            inner: store.clone(),
            next_id: 3,
        };
        let mut replay = replay_loop(producer, settings(2, 30));

        replay.step().await.unwrap();
        assert_eq!(store.staging_ids(STAGING).await, ids(&[3]));
        assert_eq!(store.live_rows(LIVE).await.len(), 2);
    }

    /// Records when each select happens and makes inserts take `insert_cost`.
    struct TimedStore {
        inner: InMemoryTableStore,
        insert_cost: Duration,
        selects: Arc<Mutex<Vec<Instant>>>,
    }

    #[async_trait]
    impl TableStore for TimedStore {
        async fn select_oldest(
            &self,
            table: &str,
            limit: usize,
        ) -> Result<Vec<StagingRecord>, StoreError> {
            self.selects.lock().unwrap().push(Instant::now());
            self.inner.select_oldest(table, limit).await
        }

        async fn insert(&self, table: &str, rows: &[LiveRecord]) -> Result<(), StoreError> {
            tokio::time::sleep(self.insert_cost).await;
            self.inner.insert(table, rows).await
        }

        async fn delete_ids(&self, table: &str, ids: &[RecordId]) -> Result<(), StoreError> {
            self.inner.delete_ids(table, ids).await
        }
    }

    async fn select_gaps(insert_cost_secs: u64, interval_secs: u64) -> Vec<Duration> {
        let selects = Arc::new(Mutex::new(Vec::new()));
        let store = TimedStore {
            inner: seeded(&[1, 2, 3]).await,
            insert_cost: Duration::from_secs(insert_cost_secs),
            selects: Arc::clone(&selects),
        };

        let summary = replay_loop(store, settings(1, interval_secs)).run().await.unwrap();
        assert_eq!(summary.stats.moved, 3);

        let starts = selects.lock().unwrap().clone();
        starts.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn iterations_start_every_interval_when_processing_is_fast() {
        let gaps = select_gaps(4, 30).await;
        assert_eq!(gaps, vec![Duration::from_secs(30); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_starts_next_iteration_immediately() {
        let gaps = select_gaps(45, 30).await;
        assert_eq!(gaps, vec![Duration::from_secs(45); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn drained_run_does_not_sleep() {
        let before = Instant::now();
        let summary = replay_loop(seeded(&[]).await, settings(1, 30)).run().await.unwrap();
        assert_eq!(summary.stats, MoveStats::default());
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }
}
