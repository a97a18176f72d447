use super::database::{DbRead, WriteTransaction};
use super::models::{Interaction, InteractionKind, Mention, NewInteraction};
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::VecDeque;
use tracing::warn;

/// Number of interactions fetched per query while a cursor is being consumed.
const CURSOR_PAGE_SIZE: usize = 32;

/// Forward-only iteration over interactions in ascending row id order.
pub trait InteractionCursor {
    /// The next interaction, or `None` once the range is exhausted.
    fn next(&mut self) -> Result<Option<Interaction>>;
}

pub trait InteractionStore: Send + Sync {
    fn insert(&self, interaction: &NewInteraction, tx: &WriteTransaction<'_>) -> Result<i64>;

    fn fetch(&self, id: i64, tx: &dyn DbRead) -> Result<Option<Interaction>>;

    /// The highest row id currently in the store, `None` when it is empty.
    fn max_row_id(&self, tx: &dyn DbRead) -> Result<Option<i64>>;

    /// A cursor over interactions with `min_row_id_exclusive < id <= max_row_id_inclusive`.
    fn fetch_cursor<'tx>(
        &self,
        min_row_id_exclusive: Option<i64>,
        max_row_id_inclusive: i64,
        tx: &'tx dyn DbRead,
    ) -> Result<Box<dyn InteractionCursor + 'tx>>;
}

pub struct SqliteInteractionStore;

impl SqliteInteractionStore {
    pub fn new() -> Self {
        Self
    }

    fn row_to_interaction(row: &Row) -> rusqlite::Result<Interaction> {
        let id: i64 = row.get("id")?;
        let kind_str: String = row.get("kind")?;
        let kind = InteractionKind::parse(&kind_str).unwrap_or(InteractionKind::Info);

        let mentions_str: String = row.get("mentions")?;
        let mentions: Vec<Mention> = match serde_json::from_str(&mentions_str) {
            Ok(mentions) => mentions,
            Err(e) => {
                warn!("Ignoring unreadable mentions of interaction {}: {}", id, e);
                vec![]
            }
        };

        Ok(Interaction {
            id,
            thread_id: row.get("thread_id")?,
            kind,
            body: row.get("body")?,
            mentions,
            timestamp: row.get("timestamp")?,
        })
    }
}

impl Default for SqliteInteractionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionStore for SqliteInteractionStore {
    fn insert(&self, interaction: &NewInteraction, tx: &WriteTransaction<'_>) -> Result<i64> {
        let mentions = serde_json::to_string(&interaction.mentions)?;
        let conn = tx.connection();
        conn.execute(
            "INSERT INTO interactions (thread_id, kind, body, mentions, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                interaction.thread_id,
                interaction.kind.as_str(),
                interaction.body,
                mentions,
                interaction.timestamp
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn fetch(&self, id: i64, tx: &dyn DbRead) -> Result<Option<Interaction>> {
        let interaction = tx
            .connection()
            .query_row(
                "SELECT id, thread_id, kind, body, mentions, timestamp
                 FROM interactions WHERE id = ?1",
                params![id],
                Self::row_to_interaction,
            )
            .optional()?;
        Ok(interaction)
    }

    fn max_row_id(&self, tx: &dyn DbRead) -> Result<Option<i64>> {
        let max: Option<i64> = tx
            .connection()
            .query_row("SELECT max(id) FROM interactions", [], |row| row.get(0))
            .context("Failed to read max interaction row id")?;
        Ok(max)
    }

    fn fetch_cursor<'tx>(
        &self,
        min_row_id_exclusive: Option<i64>,
        max_row_id_inclusive: i64,
        tx: &'tx dyn DbRead,
    ) -> Result<Box<dyn InteractionCursor + 'tx>> {
        Ok(Box::new(SqliteInteractionCursor {
            tx,
            last_row_id: min_row_id_exclusive,
            max_row_id_inclusive,
            buffer: VecDeque::with_capacity(CURSOR_PAGE_SIZE),
            exhausted: false,
        }))
    }
}

/// Pages through the range by row id, so no statement stays open while the
/// caller writes through the same transaction, and a row is never yielded
/// twice.
struct SqliteInteractionCursor<'tx> {
    tx: &'tx dyn DbRead,
    last_row_id: Option<i64>,
    max_row_id_inclusive: i64,
    buffer: VecDeque<Interaction>,
    exhausted: bool,
}

impl SqliteInteractionCursor<'_> {
    fn fetch_page(&mut self) -> Result<()> {
        let mut stmt = self.tx.connection().prepare_cached(
            "SELECT id, thread_id, kind, body, mentions, timestamp
             FROM interactions
             WHERE id > ?1 AND id <= ?2
             ORDER BY id ASC
             LIMIT ?3",
        )?;
        let page = stmt
            .query_map(
                params![
                    self.last_row_id.unwrap_or(i64::MIN),
                    self.max_row_id_inclusive,
                    CURSOR_PAGE_SIZE as i64
                ],
                SqliteInteractionStore::row_to_interaction,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if page.len() < CURSOR_PAGE_SIZE {
            self.exhausted = true;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl InteractionCursor for SqliteInteractionCursor<'_> {
    fn next(&mut self) -> Result<Option<Interaction>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page()?;
        }
        let next = self.buffer.pop_front();
        if let Some(interaction) = &next {
            self.last_row_id = Some(interaction.id);
        }
        Ok(next)
    }
}
