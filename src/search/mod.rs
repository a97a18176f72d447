//! Search projections derived from interactions.
//!
//! Every writer here is an upsert keyed on the source row, so indexing the same
//! interaction (or thread) twice leaves the same end state.

mod fts5_message_index;
mod fts5_thread_index;
mod mention_store;
mod message_indexer;

pub use fts5_message_index::{normalize_for_search, Fts5MessageIndex, MessageSearchHit};
pub use fts5_thread_index::Fts5ThreadNameIndex;
pub use mention_store::{MentionRow, SqliteMentionStore};
pub use message_indexer::MessageIndexer;

use crate::store::{Interaction, WriteTransaction};
use anyhow::Result;

/// Writes a message's body into the full-text index.
pub trait FullTextIndexer: Send + Sync {
    fn insert(&self, message: &Interaction, tx: &WriteTransaction<'_>) -> Result<()>;
}

/// Writes the mention references found in a message.
pub trait MentionIndexer: Send + Sync {
    fn insert_mentions(&self, message: &Interaction, tx: &WriteTransaction<'_>) -> Result<()>;
}

/// Indexes thread names inline, inside the caller's transaction.
pub trait ThreadNameIndexer: Send + Sync {
    fn index_threads(&self, tx: &WriteTransaction<'_>) -> Result<()>;
}
