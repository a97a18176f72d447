use super::schema::MESSAGE_DB_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

type Completion = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run read queries: both read and write transactions.
pub trait DbRead {
    fn connection(&self) -> &Connection;
}

/// A read-only transaction. Rolled back when dropped.
pub struct ReadTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl DbRead for ReadTransaction<'_> {
    fn connection(&self) -> &Connection {
        &self.tx
    }
}

/// A write transaction on the message database.
///
/// Completions registered with [`WriteTransaction::add_completion`] run after a
/// successful commit, once the connection has been released. They are dropped
/// without running when the transaction rolls back.
pub struct WriteTransaction<'conn> {
    tx: Transaction<'conn>,
    completions: Vec<Completion>,
}

impl WriteTransaction<'_> {
    pub fn add_completion<F>(&mut self, completion: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.completions.push(Box::new(completion));
    }
}

impl DbRead for WriteTransaction<'_> {
    fn connection(&self) -> &Connection {
        &self.tx
    }
}

/// The message database. A single connection guarded by a mutex, so there is
/// exactly one writer at a time; every `write` call is one transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        info!("Opening message database at {:?}", path);
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open message database at {:?}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        open_versioned(&mut conn, MESSAGE_DB_VERSIONED_SCHEMAS)
            .context("Failed to prepare message database schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Message database connection mutex poisoned"))
    }

    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTransaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = ReadTransaction {
            tx: conn.transaction_with_behavior(TransactionBehavior::Deferred)?,
        };
        f(&tx)
    }

    /// Runs `f` inside one write transaction and commits if it returns `Ok`.
    ///
    /// Any error from `f` rolls back everything it wrote.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> Result<T>,
    {
        let (value, completions) = {
            let mut conn = self.lock()?;
            let mut tx = WriteTransaction {
                tx: conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
                completions: Vec::new(),
            };
            let value = f(&mut tx)?;
            let WriteTransaction { tx, completions } = tx;
            tx.commit().context("Failed to commit write transaction")?;
            (value, completions)
        };

        if !completions.is_empty() {
            debug!("Running {} transaction completions", completions.len());
        }
        for completion in completions {
            completion();
        }
        Ok(value)
    }
}
