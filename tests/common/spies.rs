use anyhow::{bail, Result};
use message_search_backfill::checkpoint::{Checkpoint, CheckpointStore};
use message_search_backfill::clock::ManualClock;
use message_search_backfill::search::{Fts5MessageIndex, FullTextIndexer};
use message_search_backfill::store::{
    DbRead, Interaction, InteractionCursor, InteractionStore, NewInteraction,
    SqliteInteractionStore, WriteTransaction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the indexer saw when it was asked to index one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub interaction_id: i64,
    pub checkpoint: Checkpoint,
}

/// Full-text indexer that writes through to the real FTS5 index, records every
/// call with the checkpoint visible in the same transaction, and can move the
/// test clock or fail on chosen ids.
pub struct ObservingIndexer {
    inner: Fts5MessageIndex,
    clock: Arc<ManualClock>,
    checkpoint_store: CheckpointStore,
    observations: Mutex<Vec<Observation>>,
    advance_after_every_insert: Mutex<i64>,
    advance_after_id: Mutex<HashMap<i64, i64>>,
    fail_on_id: Mutex<Option<i64>>,
}

impl ObservingIndexer {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            inner: Fts5MessageIndex::new(),
            clock,
            checkpoint_store: CheckpointStore::new(),
            observations: Mutex::new(Vec::new()),
            advance_after_every_insert: Mutex::new(0),
            advance_after_id: Mutex::new(HashMap::new()),
            fail_on_id: Mutex::new(None),
        }
    }

    /// Every insert moves the clock forward by `millis`.
    pub fn cost_per_insert(&self, millis: i64) {
        *self.advance_after_every_insert.lock().unwrap() = millis;
    }

    /// Indexing `id` moves the clock forward by `millis`.
    pub fn advance_clock_after(&self, id: i64, millis: i64) {
        self.advance_after_id.lock().unwrap().insert(id, millis);
    }

    pub fn fail_on(&self, id: Option<i64>) {
        *self.fail_on_id.lock().unwrap() = id;
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    pub fn indexed_ids(&self) -> Vec<i64> {
        self.observations()
            .iter()
            .map(|o| o.interaction_id)
            .collect()
    }

    pub fn reset_observations(&self) {
        self.observations.lock().unwrap().clear();
    }
}

impl FullTextIndexer for ObservingIndexer {
    fn insert(&self, message: &Interaction, tx: &WriteTransaction<'_>) -> Result<()> {
        if *self.fail_on_id.lock().unwrap() == Some(message.id) {
            bail!("Injected indexing failure on interaction {}", message.id);
        }
        let checkpoint = self.checkpoint_store.load(tx)?;
        self.inner.insert(message, tx)?;
        self.observations.lock().unwrap().push(Observation {
            interaction_id: message.id,
            checkpoint,
        });

        let every = *self.advance_after_every_insert.lock().unwrap();
        let extra = self
            .advance_after_id
            .lock()
            .unwrap()
            .get(&message.id)
            .copied()
            .unwrap_or(0);
        self.clock.advance(every + extra);
        Ok(())
    }
}

/// Interaction store that counts how often the backfill touches it and can
/// fail reads of the max row id.
pub struct CountingInteractionStore {
    inner: SqliteInteractionStore,
    cursor_opens: AtomicUsize,
    cursor_reads: Arc<AtomicUsize>,
    max_row_id_reads: AtomicUsize,
    fail_max_row_id: AtomicBool,
}

impl CountingInteractionStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteInteractionStore::new(),
            cursor_opens: AtomicUsize::new(0),
            cursor_reads: Arc::new(AtomicUsize::new(0)),
            max_row_id_reads: AtomicUsize::new(0),
            fail_max_row_id: AtomicBool::new(false),
        }
    }

    pub fn cursor_opens(&self) -> usize {
        self.cursor_opens.load(Ordering::SeqCst)
    }

    pub fn cursor_reads(&self) -> usize {
        self.cursor_reads.load(Ordering::SeqCst)
    }

    pub fn max_row_id_reads(&self) -> usize {
        self.max_row_id_reads.load(Ordering::SeqCst)
    }

    pub fn fail_max_row_id(&self, fail: bool) {
        self.fail_max_row_id.store(fail, Ordering::SeqCst);
    }
}

struct CountingCursor<'tx> {
    inner: Box<dyn InteractionCursor + 'tx>,
    reads: Arc<AtomicUsize>,
}

impl InteractionCursor for CountingCursor<'_> {
    fn next(&mut self) -> Result<Option<Interaction>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.next()
    }
}

impl InteractionStore for CountingInteractionStore {
    fn insert(&self, interaction: &NewInteraction, tx: &WriteTransaction<'_>) -> Result<i64> {
        self.inner.insert(interaction, tx)
    }

    fn fetch(&self, id: i64, tx: &dyn DbRead) -> Result<Option<Interaction>> {
        self.inner.fetch(id, tx)
    }

    fn max_row_id(&self, tx: &dyn DbRead) -> Result<Option<i64>> {
        self.max_row_id_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_max_row_id.load(Ordering::SeqCst) {
            bail!("Injected failure reading max interaction row id");
        }
        self.inner.max_row_id(tx)
    }

    fn fetch_cursor<'tx>(
        &self,
        min_row_id_exclusive: Option<i64>,
        max_row_id_inclusive: i64,
        tx: &'tx dyn DbRead,
    ) -> Result<Box<dyn InteractionCursor + 'tx>> {
        self.cursor_opens.fetch_add(1, Ordering::SeqCst);
        let inner = self
            .inner
            .fetch_cursor(min_row_id_exclusive, max_row_id_inclusive, tx)?;
        Ok(Box::new(CountingCursor {
            inner,
            reads: self.cursor_reads.clone(),
        }))
    }
}
