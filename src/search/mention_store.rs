use super::MentionIndexer;
use crate::store::{DbRead, Interaction, WriteTransaction};
use anyhow::Result;
use rusqlite::params;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionRow {
    pub interaction_id: i64,
    pub thread_id: String,
    pub mentioned_aci: String,
}

/// Mention references, one row per (interaction, mentioned account).
pub struct SqliteMentionStore;

impl SqliteMentionStore {
    pub fn new() -> Self {
        Self
    }

    pub fn mentions_of(&self, aci: &str, tx: &dyn DbRead) -> Result<Vec<MentionRow>> {
        let mut stmt = tx.connection().prepare(
            "SELECT interaction_id, thread_id, mentioned_aci
             FROM mentions
             WHERE mentioned_aci = ?1
             ORDER BY interaction_id ASC",
        )?;
        let rows = stmt
            .query_map(params![aci], |row| {
                Ok(MentionRow {
                    interaction_id: row.get(0)?,
                    thread_id: row.get(1)?,
                    mentioned_aci: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn all(&self, tx: &dyn DbRead) -> Result<Vec<MentionRow>> {
        let mut stmt = tx.connection().prepare(
            "SELECT interaction_id, thread_id, mentioned_aci
             FROM mentions
             ORDER BY interaction_id ASC, mentioned_aci ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MentionRow {
                    interaction_id: row.get(0)?,
                    thread_id: row.get(1)?,
                    mentioned_aci: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl Default for SqliteMentionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MentionIndexer for SqliteMentionStore {
    fn insert_mentions(&self, message: &Interaction, tx: &WriteTransaction<'_>) -> Result<()> {
        let mut stmt = tx.connection().prepare_cached(
            "INSERT INTO mentions (interaction_id, thread_id, mentioned_aci)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(interaction_id, mentioned_aci) DO NOTHING",
        )?;
        for mention in &message.mentions {
            if mention.aci.trim().is_empty() {
                debug!("Skipping mention without account in interaction {}", message.id);
                continue;
            }
            stmt.execute(params![message.id, message.thread_id, mention.aci])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Database, InteractionKind, Mention};

    fn message_with_mentions(id: i64, acis: &[&str]) -> Interaction {
        Interaction {
            id,
            thread_id: "t1".to_string(),
            kind: InteractionKind::OutgoingMessage,
            body: Some("\u{fffc} hi".to_string()),
            mentions: acis
                .iter()
                .map(|aci| Mention {
                    aci: aci.to_string(),
                    start: 0,
                    length: 1,
                })
                .collect(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_mentions_are_inserted_once() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteMentionStore::new();
        let message = message_with_mentions(3, &["alice", "bob", "alice"]);

        db.write(|tx| store.insert_mentions(&message, tx)).unwrap();
        db.write(|tx| store.insert_mentions(&message, tx)).unwrap();

        let all = db.read(|tx| store.all(tx)).unwrap();
        assert_eq!(all.len(), 2);
        let alice = db.read(|tx| store.mentions_of("alice", tx)).unwrap();
        assert_eq!(
            alice,
            vec![MentionRow {
                interaction_id: 3,
                thread_id: "t1".to_string(),
                mentioned_aci: "alice".to_string(),
            }]
        );
    }

    #[test]
    fn test_blank_accounts_are_skipped() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteMentionStore::new();

        db.write(|tx| store.insert_mentions(&message_with_mentions(1, &[" "]), tx))
            .unwrap();

        assert!(db.read(|tx| store.all(tx)).unwrap().is_empty());
    }
}
