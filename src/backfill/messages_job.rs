use crate::background_jobs::{AppReadiness, JobError, JobOutcome};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::clock::Clock;
use crate::metrics;
use crate::search::MessageIndexer;
use crate::store::{Database, InteractionStore, WriteTransaction};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a single batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The time budget ran out and more work remains.
    Paused,
    /// The run is done and the checkpoint was cleared.
    Complete,
    /// No run was pending when the batch started.
    NothingScheduled,
}

impl BatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Paused => "paused",
            BatchOutcome::Complete => "complete",
            BatchOutcome::NothingScheduled => "nothing_scheduled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    /// Checkpoint as read at the start of the batch.
    pub started_from: Checkpoint,
    /// Interactions visited, messages or not.
    pub processed: usize,
    /// Highest row id visited in this batch.
    pub high_water_mark: Option<i64>,
}

/// Indexes every interaction that existed when the run was scheduled, in
/// time-boxed batches, each one its own write transaction.
///
/// Progress lives in the checkpoint, so a run interrupted by a crash or a
/// shutdown resumes after the last committed batch.
pub struct MessagesBackfillJob {
    database: Database,
    interaction_store: Arc<dyn InteractionStore>,
    message_indexer: MessageIndexer,
    checkpoint_store: CheckpointStore,
    clock: Arc<dyn Clock>,
    readiness: AppReadiness,
    batch_duration: Duration,
}

impl MessagesBackfillJob {
    pub fn new(
        database: Database,
        interaction_store: Arc<dyn InteractionStore>,
        message_indexer: MessageIndexer,
        clock: Arc<dyn Clock>,
        readiness: AppReadiness,
        batch_duration: Duration,
    ) -> Self {
        Self {
            database,
            interaction_store,
            message_indexer,
            checkpoint_store: CheckpointStore::new(),
            clock,
            readiness,
            batch_duration,
        }
    }

    pub fn checkpoint(&self) -> Result<Checkpoint> {
        self.database.read(|tx| self.checkpoint_store.load(tx))
    }

    /// Starts a new run covering everything up to the current max row id.
    /// Any progress of a run in flight is discarded.
    ///
    /// Returns the new upper bound, or `None` when the store is empty and
    /// nothing needs to run.
    pub fn schedule(&self, tx: &WriteTransaction<'_>) -> Result<Option<i64>> {
        self.checkpoint_store.set_min(None, tx)?;
        let max_row_id = self.interaction_store.max_row_id(tx)?;
        if let Some(max_row_id) = max_row_id {
            self.checkpoint_store.set_max(Some(max_row_id), tx)?;
            info!(
                "Scheduled messages backfill up to interaction {}",
                max_row_id
            );
        } else {
            debug!("No interactions to backfill");
        }
        Ok(max_row_id)
    }

    /// Runs one batch in its own write transaction.
    ///
    /// The checkpoint is read inside the transaction, so a schedule committed
    /// between two batches is picked up by the next one.
    pub fn run_batch(&self) -> Result<BatchReport> {
        let budget_ms = self.batch_duration.as_millis() as i64;

        self.database.write(|tx| {
            let tx: &WriteTransaction<'_> = tx;
            let started_from = self.checkpoint_store.load(tx)?;
            let Some(max_row_id) = started_from.max_row_id_inclusive else {
                return Ok(BatchReport {
                    outcome: BatchOutcome::NothingScheduled,
                    started_from,
                    processed: 0,
                    high_water_mark: None,
                });
            };

            let batch_start = self.clock.now_millis();
            let mut processed = 0;
            let mut high_water_mark = None;
            let mut out_of_time = false;

            let mut cursor = self.interaction_store.fetch_cursor(
                started_from.min_row_id_exclusive,
                max_row_id,
                tx,
            )?;
            while let Some(interaction) = cursor.next()? {
                if self.clock.now_millis() - batch_start > budget_ms {
                    out_of_time = true;
                    break;
                }
                self.message_indexer.index(&interaction, tx)?;
                high_water_mark = Some(interaction.id);
                processed += 1;
            }
            drop(cursor);

            let outcome = match high_water_mark {
                Some(mark) if mark >= max_row_id => {
                    self.checkpoint_store.clear(tx)?;
                    BatchOutcome::Complete
                }
                _ if !out_of_time => {
                    // Ids past the mark up to max were deleted or never allocated
                    debug!(
                        "Cursor exhausted before interaction {}, nothing left to index",
                        max_row_id
                    );
                    self.checkpoint_store.clear(tx)?;
                    BatchOutcome::Complete
                }
                Some(mark) => {
                    self.checkpoint_store.set_min(Some(mark), tx)?;
                    BatchOutcome::Paused
                }
                None => {
                    debug!(
                        "Batch ran out of time before its first interaction, checkpoint unchanged at {:?}",
                        started_from.min_row_id_exclusive
                    );
                    BatchOutcome::Paused
                }
            };

            Ok(BatchReport {
                outcome,
                started_from,
                processed,
                high_water_mark,
            })
        })
    }

    /// Processes the pending run, if any, batch after batch until it is done.
    ///
    /// Does nothing before the app is ready or when no run is pending. An error
    /// rolls back the failing batch only; earlier batches stay committed.
    pub fn run_if_needed(&self) -> Result<JobOutcome, JobError> {
        if !self.readiness.is_app_ready() {
            debug!("App not ready, skipping messages backfill");
            return Ok(JobOutcome::NotReady);
        }

        let checkpoint = self.checkpoint()?;
        let Some(max_row_id) = checkpoint.max_row_id_inclusive else {
            debug!("No messages backfill scheduled");
            return Ok(JobOutcome::NothingScheduled);
        };

        info!(
            "Starting job: index interactions after {:?} up to {}",
            checkpoint.min_row_id_exclusive, max_row_id
        );
        metrics::set_job_running(true);
        let result = self.run_batches(checkpoint);
        metrics::set_job_running(false);
        result
    }

    fn run_batches(&self, mut expected: Checkpoint) -> Result<JobOutcome, JobError> {
        let job_start = Instant::now();
        let mut batches = 0;
        let mut processed = 0;

        loop {
            let batch_start = Instant::now();
            let report = self.run_batch()?;

            if report.started_from != expected {
                info!(
                    "Checkpoint changed between batches, now {:?}",
                    report.started_from
                );
            }

            match report.outcome {
                BatchOutcome::NothingScheduled => {
                    warn!("Pending run disappeared before the next batch");
                    if batches == 0 {
                        return Ok(JobOutcome::NothingScheduled);
                    }
                    break;
                }
                BatchOutcome::Paused => {
                    metrics::record_batch(
                        report.outcome.as_str(),
                        report.processed,
                        batch_start.elapsed(),
                    );
                    batches += 1;
                    processed += report.processed;
                    info!(
                        "Bailing on batch after {} interactions",
                        report.processed
                    );
                    expected = Checkpoint {
                        min_row_id_exclusive: report
                            .high_water_mark
                            .or(report.started_from.min_row_id_exclusive),
                        max_row_id_inclusive: report.started_from.max_row_id_inclusive,
                    };
                    info!("Starting next batch");
                }
                BatchOutcome::Complete => {
                    metrics::record_batch(
                        report.outcome.as_str(),
                        report.processed,
                        batch_start.elapsed(),
                    );
                    batches += 1;
                    processed += report.processed;
                    break;
                }
            }
        }

        info!(
            "Finished: {} interactions in {} batches, took {:?}",
            processed,
            batches,
            job_start.elapsed()
        );
        Ok(JobOutcome::Completed { batches, processed })
    }
}
