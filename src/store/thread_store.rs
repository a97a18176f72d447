use super::database::{DbRead, WriteTransaction};
use super::models::Thread;
use anyhow::Result;
use rusqlite::params;

pub struct SqliteThreadStore;

impl SqliteThreadStore {
    pub fn new() -> Self {
        Self
    }

    /// Inserts the thread or updates its name. Returns the thread's row id.
    pub fn upsert(
        &self,
        unique_id: &str,
        name: Option<&str>,
        tx: &WriteTransaction<'_>,
    ) -> Result<i64> {
        let id = tx.connection().query_row(
            "INSERT INTO threads (unique_id, name) VALUES (?1, ?2)
             ON CONFLICT(unique_id) DO UPDATE SET name = COALESCE(?2, name)
             RETURNING id",
            params![unique_id, name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn all(&self, tx: &dyn DbRead) -> Result<Vec<Thread>> {
        let mut stmt = tx
            .connection()
            .prepare("SELECT id, unique_id, name FROM threads ORDER BY id ASC")?;
        let threads = stmt
            .query_map([], |row| {
                Ok(Thread {
                    id: row.get("id")?,
                    unique_id: row.get("unique_id")?,
                    name: row.get("name")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(threads)
    }
}

impl Default for SqliteThreadStore {
    fn default() -> Self {
        Self::new()
    }
}
