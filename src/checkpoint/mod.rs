//! Durable progress of the messages backfill.
//!
//! Two optional row ids in a dedicated key/value collection:
//! - `minInteractionRowIdKey` (exclusive): the last row id already indexed.
//!   Absent means the scan starts from the lowest row id.
//! - `maxInteractionRowIdKey` (inclusive): the highest row id that existed when
//!   the run was scheduled. Absent means there is no pending run.
//!
//! Every read and write goes through a transaction handle; callers compose
//! both keys in one transaction when they need them to agree.

mod key_value_store;

pub use key_value_store::KeyValueStore;

use crate::store::{DbRead, WriteTransaction};
use anyhow::Result;
use serde::Serialize;

const COLLECTION: &str = "BackupFullTextSearchIndexer";
const MIN_INTERACTION_ROW_ID_KEY: &str = "minInteractionRowIdKey";
const MAX_INTERACTION_ROW_ID_KEY: &str = "maxInteractionRowIdKey";

/// Snapshot of both checkpoint keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub min_row_id_exclusive: Option<i64>,
    pub max_row_id_inclusive: Option<i64>,
}

impl Checkpoint {
    pub fn is_pending(&self) -> bool {
        self.max_row_id_inclusive.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    kv_store: KeyValueStore,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self {
            kv_store: KeyValueStore::new(COLLECTION),
        }
    }

    pub fn load(&self, tx: &dyn DbRead) -> Result<Checkpoint> {
        Ok(Checkpoint {
            min_row_id_exclusive: self.get_min(tx)?,
            max_row_id_inclusive: self.get_max(tx)?,
        })
    }

    pub fn get_min(&self, tx: &dyn DbRead) -> Result<Option<i64>> {
        self.kv_store.get_i64(MIN_INTERACTION_ROW_ID_KEY, tx)
    }

    pub fn set_min(&self, value: Option<i64>, tx: &WriteTransaction<'_>) -> Result<()> {
        self.set(MIN_INTERACTION_ROW_ID_KEY, value, tx)
    }

    pub fn get_max(&self, tx: &dyn DbRead) -> Result<Option<i64>> {
        self.kv_store.get_i64(MAX_INTERACTION_ROW_ID_KEY, tx)
    }

    pub fn set_max(&self, value: Option<i64>, tx: &WriteTransaction<'_>) -> Result<()> {
        self.set(MAX_INTERACTION_ROW_ID_KEY, value, tx)
    }

    /// Clears both keys: no run pending.
    pub fn clear(&self, tx: &WriteTransaction<'_>) -> Result<()> {
        self.set_max(None, tx)?;
        self.set_min(None, tx)
    }

    fn set(&self, key: &str, value: Option<i64>, tx: &WriteTransaction<'_>) -> Result<()> {
        match value {
            Some(value) => self.kv_store.set_i64(value, key, tx),
            None => self.kv_store.remove(key, tx),
        }
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}
