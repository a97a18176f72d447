//! Loads interactions from a JSON lines file, one interaction per line.

use crate::store::{Database, InteractionStore, NewInteraction, SqliteThreadStore};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(flatten)]
    interaction: NewInteraction,
    #[serde(default)]
    thread_name: Option<String>,
}

/// Appends every interaction in `path` within a single transaction, creating
/// threads as they are first seen. Returns the number of interactions added.
///
/// Blank lines are ignored; any malformed line aborts the whole import.
pub fn import_jsonl(
    path: &Path,
    database: &Database,
    interaction_store: &dyn InteractionStore,
) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid interaction on line {}", index + 1))?;
        records.push(record);
    }

    let thread_store = SqliteThreadStore::new();
    let imported = database.write(|tx| {
        for record in &records {
            thread_store.upsert(
                &record.interaction.thread_id,
                record.thread_name.as_deref(),
                tx,
            )?;
            interaction_store.insert(&record.interaction, tx)?;
        }
        Ok(records.len())
    })?;

    info!("Imported {} interactions from {:?}", imported, path);
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InteractionKind, SqliteInteractionStore};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_lines_and_threads() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"thread_id": "t1", "thread_name": "Crew", "kind": "incoming_message", "body": "hello", "timestamp": 1}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"thread_id": "t1", "kind": "info", "timestamp": 2}}"#
        )
        .unwrap();

        let db = Database::open_in_memory().unwrap();
        let store = SqliteInteractionStore::new();
        let count = import_jsonl(file.path(), &db, &store).unwrap();

        assert_eq!(count, 2);
        let second = db.read(|tx| store.fetch(2, tx)).unwrap().unwrap();
        assert_eq!(second.kind, InteractionKind::Info);
        let threads = db.read(|tx| SqliteThreadStore::new().all(tx)).unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].name.as_deref(), Some("Crew"));
    }

    #[test]
    fn test_malformed_line_imports_nothing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"thread_id": "t1", "kind": "incoming_message", "body": "ok", "timestamp": 1}}"#
        )
        .unwrap();
        writeln!(file, "not json").unwrap();

        let db = Database::open_in_memory().unwrap();
        let store = SqliteInteractionStore::new();
        let err = import_jsonl(file.path(), &db, &store).unwrap_err();

        assert!(err.to_string().contains("line 2"));
        assert_eq!(db.read(|tx| store.max_row_id(tx)).unwrap(), None);
    }
}
