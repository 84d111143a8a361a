//! Key-value backends.
//!
//! The message store only needs three byte-level operations, captured by
//! [`KvStore`]. Two backends are provided:
//!
//! | Backend | Durability | Use |
//! |---------|------------|-----|
//! | [`SqliteKvStore`] | on disk (single SQLite file, WAL) | production |
//! | [`MemoryKvStore`] | process lifetime | tests, ephemeral bots |
//!
//! Backends are synchronous; [`MessageStore`](super::MessageStore) moves
//! calls onto the blocking pool.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::foundation::error::{StoreError, StoreResult};

/// A byte-keyed, byte-valued store.
pub trait KvStore: Send + Sync + 'static {
    /// Reads the value stored under `key`.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Releases the backend. Further calls fail with [`StoreError::Closed`].
    fn close(&self) -> StoreResult<()>;
}

// =============================================================================
// SQLite
// =============================================================================

/// A [`KvStore`] backed by a single SQLite table.
pub struct SqliteKvStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteKvStore {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        debug!(path = %path.display(), "Opened SQLite message database");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Opens a private in-memory SQLite database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn init(conn: &Connection) -> StoreResult<()> {
        // journal_mode returns a row, so it cannot go through execute_batch.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id     BLOB PRIMARY KEY,
                record BLOB NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let value = conn
            .query_row(
                "SELECT record FROM messages WHERE id = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        conn.execute(
            "INSERT OR REPLACE INTO messages (id, record) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        match self.conn.lock().take() {
            Some(conn) => conn.close().map_err(|(_, e)| StoreError::Backend(e)),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Memory
// =============================================================================

/// A [`KvStore`] kept entirely in process memory.
pub struct MemoryKvStore {
    entries: RwLock<Option<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Returns the number of stored entries (zero once closed).
    pub fn len(&self) -> usize {
        self.entries.read().as_ref().map_or(0, HashMap::len)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let guard = self.entries.read();
        let entries = guard.as_ref().ok_or(StoreError::Closed)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let mut guard = self.entries.write();
        let entries = guard.as_mut().ok_or(StoreError::Closed)?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        self.entries.write().take();
        Ok(())
    }
}
