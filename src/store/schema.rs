//! SQLite schema definitions for the message database.
//!
//! Holds the interactions the backfill scans, the thread list, the namespaced
//! key/value table the backfill keeps its checkpoint in, the mention
//! references and the two FTS5 indexes.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, VirtualTable};

// =============================================================================
// Version 1
// =============================================================================

/// Threads table - conversations the interactions belong to
const THREADS_TABLE_V1: Table = Table {
    name: "threads",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("unique_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["unique_id"]],
};

/// Interactions table - append-only, row ids are never reused
const INTERACTIONS_TABLE_V1: Table = Table {
    name: "interactions",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("thread_id", &SqlType::Text, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("body", &SqlType::Text),
        sqlite_column!(
            "mentions",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ),
        sqlite_column!("timestamp", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_interactions_thread_id", "thread_id")],
    unique_constraints: &[],
};

/// Key/value table - small scalar state grouped by collection
const KEY_VALUE_TABLE_V1: Table = Table {
    name: "key_value",
    columns: &[
        sqlite_column!("collection", &SqlType::Text, non_null = true),
        sqlite_column!("key", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["collection", "key"]],
};

/// Mentions table - one row per (interaction, mentioned account)
const MENTIONS_TABLE_V1: Table = Table {
    name: "mentions",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("interaction_id", &SqlType::Integer, non_null = true),
        sqlite_column!("thread_id", &SqlType::Text, non_null = true),
        sqlite_column!("mentioned_aci", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_mentions_mentioned_aci", "mentioned_aci")],
    unique_constraints: &[&["interaction_id", "mentioned_aci"]],
};

const MESSAGE_SEARCH_V1: VirtualTable = VirtualTable {
    name: "message_search",
    create_sql: "CREATE VIRTUAL TABLE IF NOT EXISTS message_search USING fts5(
        body,
        tokenize='unicode61 remove_diacritics 2'
    );",
};

const THREAD_SEARCH_V1: VirtualTable = VirtualTable {
    name: "thread_search",
    create_sql: "CREATE VIRTUAL TABLE IF NOT EXISTS thread_search USING fts5(
        name,
        tokenize='unicode61 remove_diacritics 2'
    );",
};

pub const MESSAGE_DB_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        THREADS_TABLE_V1,
        INTERACTIONS_TABLE_V1,
        KEY_VALUE_TABLE_V1,
        MENTIONS_TABLE_V1,
    ],
    virtual_tables: &[MESSAGE_SEARCH_V1, THREAD_SEARCH_V1],
    migration: None,
}];
