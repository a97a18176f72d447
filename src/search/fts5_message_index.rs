//! FTS5 index over message bodies, keyed by interaction row id.

use super::FullTextIndexer;
use crate::store::{DbRead, Interaction, WriteTransaction};
use anyhow::Result;
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSearchHit {
    pub interaction_id: i64,
    pub body: String,
    pub score: f64,
}

/// Collapses runs of whitespace and drops control characters, so that the
/// same body always produces the same index entry.
pub fn normalize_for_search(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct Fts5MessageIndex;

impl Fts5MessageIndex {
    pub fn new() -> Self {
        Self
    }

    /// Matches `query` as a phrase. Best matches first.
    pub fn search(
        &self,
        query: &str,
        max_results: usize,
        tx: &dyn DbRead,
    ) -> Result<Vec<MessageSearchHit>> {
        let normalized = normalize_for_search(query);
        if normalized.is_empty() {
            return Ok(vec![]);
        }
        // Quote the query so FTS5 operators in user input are taken literally
        let phrase = format!("\"{}\"", normalized.replace('"', "\"\""));

        let mut stmt = tx.connection().prepare(
            "SELECT rowid, body, bm25(message_search) AS score
             FROM message_search
             WHERE message_search MATCH ?1
             ORDER BY score, rowid
             LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(params![phrase, max_results as i64], |row| {
                Ok(MessageSearchHit {
                    interaction_id: row.get(0)?,
                    body: row.get(1)?,
                    // BM25 is negative, more negative is better
                    score: -row.get::<_, f64>(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    pub fn indexed_count(&self, tx: &dyn DbRead) -> Result<usize> {
        let count: i64 =
            tx.connection()
                .query_row("SELECT count(*) FROM message_search", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Interaction ids present in the index, ascending.
    pub fn indexed_ids(&self, tx: &dyn DbRead) -> Result<Vec<i64>> {
        let mut stmt = tx
            .connection()
            .prepare("SELECT rowid FROM message_search ORDER BY rowid ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}

impl Default for Fts5MessageIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FullTextIndexer for Fts5MessageIndex {
    fn insert(&self, message: &Interaction, tx: &WriteTransaction<'_>) -> Result<()> {
        let conn = tx.connection();
        conn.execute(
            "DELETE FROM message_search WHERE rowid = ?1",
            params![message.id],
        )?;

        let body = message
            .body
            .as_deref()
            .map(normalize_for_search)
            .unwrap_or_default();
        if body.is_empty() {
            return Ok(());
        }

        conn.execute(
            "INSERT INTO message_search (rowid, body) VALUES (?1, ?2)",
            params![message.id, body],
        )?;
        Ok(())
    }
}
