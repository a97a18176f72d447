use super::{FullTextIndexer, MentionIndexer};
use crate::store::{Interaction, WriteTransaction};
use anyhow::Result;
use std::sync::Arc;

/// Projects one interaction into the message index and the mention index.
#[derive(Clone)]
pub struct MessageIndexer {
    full_text_indexer: Arc<dyn FullTextIndexer>,
    mention_indexer: Arc<dyn MentionIndexer>,
}

impl MessageIndexer {
    pub fn new(
        full_text_indexer: Arc<dyn FullTextIndexer>,
        mention_indexer: Arc<dyn MentionIndexer>,
    ) -> Self {
        Self {
            full_text_indexer,
            mention_indexer,
        }
    }

    /// Indexes `interaction` if it is a message; anything else is skipped.
    pub fn index(&self, interaction: &Interaction, tx: &WriteTransaction<'_>) -> Result<()> {
        if !interaction.is_message() {
            return Ok(());
        }
        self.full_text_indexer.insert(interaction, tx)?;
        self.mention_indexer.insert_mentions(interaction, tx)
    }
}
