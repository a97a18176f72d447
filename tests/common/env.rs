use super::spies::{CountingInteractionStore, ObservingIndexer};
use message_search_backfill::backfill::{
    BackfillDependencies, BackfillSettings, BackupSearchIndexer, FullTextSearchBackfill,
    MessagesBackfillJob,
};
use message_search_backfill::background_jobs::AppReadiness;
use message_search_backfill::checkpoint::{Checkpoint, CheckpointStore};
use message_search_backfill::clock::ManualClock;
use message_search_backfill::search::{
    Fts5MessageIndex, Fts5ThreadNameIndex, MentionRow, MessageIndexer, SqliteMentionStore,
};
use message_search_backfill::store::{
    Database, DbRead, InteractionStore, Mention, NewInteraction, SqliteThreadStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BATCH_BUDGET: Duration = Duration::from_millis(90);

/// A message database on disk with the backfill wired to spies.
///
/// `backfill` is the full facade with its lane and readiness trigger. `job` is
/// a second handle on the same data, always ready, for tests that drive
/// batches one by one.
pub struct TestEnv {
    _temp_dir: TempDir,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub readiness: AppReadiness,
    pub store: Arc<CountingInteractionStore>,
    pub indexer: Arc<ObservingIndexer>,
    pub mentions: Arc<SqliteMentionStore>,
    pub backfill: Arc<FullTextSearchBackfill>,
    pub job: MessagesBackfillJob,
    fts: Fts5MessageIndex,
}

impl TestEnv {
    pub fn ready() -> Self {
        Self::build(AppReadiness::ready(), BATCH_BUDGET)
    }

    pub fn not_ready() -> Self {
        Self::build(AppReadiness::new(), BATCH_BUDGET)
    }

    pub fn build(readiness: AppReadiness, batch_duration: Duration) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("messages.db")).unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = Arc::new(CountingInteractionStore::new());
        let indexer = Arc::new(ObservingIndexer::new(clock.clone()));
        let mentions = Arc::new(SqliteMentionStore::new());

        let backfill = FullTextSearchBackfill::new(BackfillDependencies {
            database: db.clone(),
            interaction_store: store.clone(),
            full_text_indexer: indexer.clone(),
            mention_indexer: mentions.clone(),
            thread_name_indexer: Arc::new(Fts5ThreadNameIndex::new()),
            clock: clock.clone(),
            readiness: readiness.clone(),
            settings: BackfillSettings { batch_duration },
        });
        let job = MessagesBackfillJob::new(
            db.clone(),
            store.clone(),
            MessageIndexer::new(indexer.clone(), mentions.clone()),
            clock.clone(),
            AppReadiness::ready(),
            batch_duration,
        );

        Self {
            _temp_dir: temp_dir,
            db,
            clock,
            readiness,
            store,
            indexer,
            mentions,
            backfill,
            job,
            fts: Fts5MessageIndex::new(),
        }
    }

    /// Appends `count` messages; every third one mentions "alice".
    pub fn seed_messages(&self, count: usize) -> Vec<i64> {
        let threads = SqliteThreadStore::new();
        self.db
            .write(|tx| {
                threads.upsert("t1", Some("Test thread"), tx)?;
                let mut ids = Vec::with_capacity(count);
                for i in 0..count {
                    let mut interaction =
                        NewInteraction::message("t1", &format!("message number {}", i), i as i64);
                    if i % 3 == 0 {
                        interaction = interaction.with_mentions(vec![Mention {
                            aci: "alice".to_string(),
                            start: 0,
                            length: 1,
                        }]);
                    }
                    ids.push(self.store.insert(&interaction, tx)?);
                }
                Ok(ids)
            })
            .unwrap()
    }

    pub fn seed_info(&self) -> i64 {
        self.db
            .write(|tx| self.store.insert(&NewInteraction::info("t1", 0), tx))
            .unwrap()
    }

    /// Removes a row behind the store's back, leaving a hole in the id range.
    pub fn delete(&self, id: i64) {
        self.db
            .write(|tx| {
                tx.connection()
                    .execute("DELETE FROM interactions WHERE id = ?1", [id])?;
                Ok(())
            })
            .unwrap();
    }

    /// Schedules through the facade; an attempt is enqueued on commit.
    pub fn schedule(&self) -> anyhow::Result<()> {
        self.db
            .write(|tx| self.backfill.schedule_messages_job(tx))
    }

    /// Schedules through `job` without touching the lane.
    pub fn schedule_direct(&self) -> Option<i64> {
        self.db.write(|tx| self.job.schedule(tx)).unwrap()
    }

    pub fn set_checkpoint(&self, checkpoint: Checkpoint) {
        let store = CheckpointStore::new();
        self.db
            .write(|tx| {
                store.set_min(checkpoint.min_row_id_exclusive, tx)?;
                store.set_max(checkpoint.max_row_id_inclusive, tx)
            })
            .unwrap();
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.job.checkpoint().unwrap()
    }

    /// Ids present in the FTS5 message index.
    pub fn indexed_ids(&self) -> Vec<i64> {
        self.db.read(|tx| self.fts.indexed_ids(tx)).unwrap()
    }

    pub fn mention_rows(&self) -> Vec<MentionRow> {
        self.db.read(|tx| self.mentions.all(tx)).unwrap()
    }
}

/// Polls `condition` until it holds, panicking after five seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Condition not met within 5 seconds");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
