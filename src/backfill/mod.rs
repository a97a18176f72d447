//! Backup search indexing: thread names inline, messages as a resumable
//! background job on a serialized lane.
//!
//! A run is triggered once when the app becomes ready and again on every
//! [`BackupSearchIndexer::schedule_messages_job`] commit. Attempts never overlap;
//! an attempt with nothing pending is a no-op.

mod messages_job;

pub use messages_job::{BatchOutcome, BatchReport, MessagesBackfillJob};

use crate::background_jobs::{AppReadiness, JobError, JobOutcome, SerialTaskQueue};
use crate::checkpoint::Checkpoint;
use crate::clock::Clock;
use crate::metrics;
use crate::search::{FullTextIndexer, MentionIndexer, MessageIndexer, ThreadNameIndexer};
use crate::store::{Database, InteractionStore, WriteTransaction};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error};

pub const DEFAULT_BATCH_DURATION: Duration = Duration::from_millis(90);

#[derive(Debug, Clone)]
pub struct BackfillSettings {
    /// Longest a single batch may keep the write transaction busy.
    pub batch_duration: Duration,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            batch_duration: DEFAULT_BATCH_DURATION,
        }
    }
}

/// Entry points used by the rest of the app when search indexes need to be
/// rebuilt, typically after restoring a backup.
pub trait BackupSearchIndexer: Send + Sync {
    /// Indexes all thread names within `tx`.
    fn index_threads(&self, tx: &WriteTransaction<'_>) -> Result<()>;

    /// Schedules a full messages backfill. The job starts after `tx` commits.
    fn schedule_messages_job(&self, tx: &mut WriteTransaction<'_>) -> Result<()>;
}

pub struct BackfillDependencies {
    pub database: Database,
    pub interaction_store: Arc<dyn InteractionStore>,
    pub full_text_indexer: Arc<dyn FullTextIndexer>,
    pub mention_indexer: Arc<dyn MentionIndexer>,
    pub thread_name_indexer: Arc<dyn ThreadNameIndexer>,
    pub clock: Arc<dyn Clock>,
    pub readiness: AppReadiness,
    pub settings: BackfillSettings,
}

pub struct FullTextSearchBackfill {
    messages_job: Arc<MessagesBackfillJob>,
    thread_name_indexer: Arc<dyn ThreadNameIndexer>,
    queue: SerialTaskQueue,
}

impl FullTextSearchBackfill {
    /// Builds the backfill and arms the readiness trigger. Must be called from
    /// within a tokio runtime.
    pub fn new(deps: BackfillDependencies) -> Arc<Self> {
        let messages_job = Arc::new(MessagesBackfillJob::new(
            deps.database,
            deps.interaction_store,
            MessageIndexer::new(deps.full_text_indexer, deps.mention_indexer),
            deps.clock,
            deps.readiness.clone(),
            deps.settings.batch_duration,
        ));
        let queue = SerialTaskQueue::new("backup-search-indexer");

        let trigger_queue = queue.clone();
        let trigger_job = messages_job.clone();
        deps.readiness.run_when_ready(move || async move {
            debug!("App ready, enqueueing messages backfill attempt");
            let _ = enqueue_attempt(&trigger_queue, trigger_job);
        });

        Arc::new(Self {
            messages_job,
            thread_name_indexer: deps.thread_name_indexer,
            queue,
        })
    }

    /// Enqueues an attempt and waits for it to finish.
    pub async fn run_messages_job_now(&self) -> Result<JobOutcome, JobError> {
        enqueue_attempt(&self.queue, self.messages_job.clone())
            .await
            .map_err(|_| JobError::QueueClosed)?
    }

    /// Waits for every attempt enqueued so far.
    pub async fn flush(&self) -> Result<(), JobError> {
        self.queue.flush().await
    }

    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    pub fn checkpoint(&self) -> Result<Checkpoint> {
        self.messages_job.checkpoint()
    }
}

impl BackupSearchIndexer for FullTextSearchBackfill {
    fn index_threads(&self, tx: &WriteTransaction<'_>) -> Result<()> {
        self.thread_name_indexer.index_threads(tx)
    }

    fn schedule_messages_job(&self, tx: &mut WriteTransaction<'_>) -> Result<()> {
        if self.messages_job.schedule(tx)?.is_some() {
            let queue = self.queue.clone();
            let job = self.messages_job.clone();
            tx.add_completion(move || {
                let _ = enqueue_attempt(&queue, job);
            });
        }
        Ok(())
    }
}

/// Queues one attempt at the messages job. The blocking SQLite work runs on the
/// blocking pool; the lane stays occupied until it finishes.
fn enqueue_attempt(
    queue: &SerialTaskQueue,
    job: Arc<MessagesBackfillJob>,
) -> oneshot::Receiver<Result<JobOutcome, JobError>> {
    queue.enqueue(move || async move {
        let result = match tokio::task::spawn_blocking(move || job.run_if_needed()).await {
            Ok(result) => result,
            Err(e) => Err(JobError::Panicked(e.to_string())),
        };
        match &result {
            Ok(JobOutcome::Completed { .. }) => metrics::record_attempt("completed"),
            Ok(JobOutcome::NothingScheduled) => metrics::record_attempt("nothing_scheduled"),
            Ok(JobOutcome::NotReady) => metrics::record_attempt("not_ready"),
            Err(e) => {
                error!("Messages backfill attempt failed: {}", e);
                metrics::record_attempt("failed");
            }
        }
        result
    })
}
