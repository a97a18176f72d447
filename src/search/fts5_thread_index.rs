use super::{normalize_for_search, ThreadNameIndexer};
use crate::store::{DbRead, SqliteThreadStore, WriteTransaction};
use anyhow::Result;
use rusqlite::params;
use tracing::debug;

/// FTS5 index over thread names, keyed by thread row id.
///
/// Threads are few, so the whole set is reindexed in one go inside the
/// caller's transaction.
pub struct Fts5ThreadNameIndex {
    thread_store: SqliteThreadStore,
}

impl Fts5ThreadNameIndex {
    pub fn new() -> Self {
        Self {
            thread_store: SqliteThreadStore::new(),
        }
    }

    /// Unique ids of threads whose name matches `query`.
    pub fn search(&self, query: &str, tx: &dyn DbRead) -> Result<Vec<String>> {
        let normalized = normalize_for_search(query);
        if normalized.is_empty() {
            return Ok(vec![]);
        }
        let phrase = format!("\"{}\"", normalized.replace('"', "\"\""));
        let mut stmt = tx.connection().prepare(
            "SELECT threads.unique_id
             FROM thread_search JOIN threads ON threads.id = thread_search.rowid
             WHERE thread_search MATCH ?1
             ORDER BY bm25(thread_search), threads.id",
        )?;
        let ids = stmt
            .query_map(params![phrase], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

impl Default for Fts5ThreadNameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadNameIndexer for Fts5ThreadNameIndex {
    fn index_threads(&self, tx: &WriteTransaction<'_>) -> Result<()> {
        let threads = self.thread_store.all(tx)?;
        let conn = tx.connection();
        let mut delete = conn.prepare_cached("DELETE FROM thread_search WHERE rowid = ?1")?;
        let mut insert =
            conn.prepare_cached("INSERT INTO thread_search (rowid, name) VALUES (?1, ?2)")?;

        let mut indexed = 0;
        for thread in &threads {
            delete.execute(params![thread.id])?;
            let name = thread
                .name
                .as_deref()
                .map(normalize_for_search)
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            insert.execute(params![thread.id, name])?;
            indexed += 1;
        }
        debug!("Indexed {} of {} thread names", indexed, threads.len());
        Ok(())
    }
}
