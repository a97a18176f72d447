use crate::store::{DbRead, WriteTransaction};
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

/// Scalar state stored in the `key_value` table, scoped to one collection so
/// different owners cannot collide on key names.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    collection: String,
}

impl KeyValueStore {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
        }
    }

    fn get_raw(&self, key: &str, tx: &dyn DbRead) -> Result<Option<String>> {
        let value = tx
            .connection()
            .query_row(
                "SELECT value FROM key_value WHERE collection = ?1 AND key = ?2",
                params![self.collection, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get_i64(&self, key: &str, tx: &dyn DbRead) -> Result<Option<i64>> {
        self.get_raw(key, tx)?
            .map(|raw| {
                raw.parse::<i64>().with_context(|| {
                    format!(
                        "Value of {}.{} is not an integer: {:?}",
                        self.collection, key, raw
                    )
                })
            })
            .transpose()
    }

    pub fn set_i64(&self, value: i64, key: &str, tx: &WriteTransaction<'_>) -> Result<()> {
        tx.connection().execute(
            "INSERT INTO key_value (collection, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, key) DO UPDATE SET value = ?3",
            params![self.collection, key, value.to_string()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str, tx: &WriteTransaction<'_>) -> Result<()> {
        tx.connection().execute(
            "DELETE FROM key_value WHERE collection = ?1 AND key = ?2",
            params![self.collection, key],
        )?;
        Ok(())
    }
}
