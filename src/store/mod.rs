mod database;
mod interaction_store;
mod models;
mod schema;
mod thread_store;

pub use database::{Database, DbRead, ReadTransaction, WriteTransaction};
pub use interaction_store::{InteractionCursor, InteractionStore, SqliteInteractionStore};
pub use models::*;
pub use schema::MESSAGE_DB_VERSIONED_SCHEMAS;
pub use thread_store::SqliteThreadStore;
