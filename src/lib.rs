//! Message search backfill library
//!
//! Rebuilds the full-text message index and mention index from the
//! interactions table after a backup restore, in short resumable batches.

pub mod backfill;
pub mod background_jobs;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod interaction_import;
pub mod metrics;
pub mod search;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use backfill::{
    BackfillDependencies, BackfillSettings, BackupSearchIndexer, FullTextSearchBackfill,
};
pub use background_jobs::{AppReadiness, JobError, JobOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{Database, SqliteInteractionStore};
