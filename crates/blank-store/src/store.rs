use std::fs;
use std::path::Path;

use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::schema;

/// Result of a conditional update: applied, no such row, or the row exists
/// but its current state (`S`) did not allow the change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome<S> {
    Applied,
    Missing,
    Blocked(S),
}

/// One SQLite connection for the life of the process. Call
/// [`Store::checkpoint_truncate`] before exit so the WAL is folded back;
/// the connection closes on drop.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::InvalidData(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!(path = %path.display(), "store opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Lifecycle ---

    /// Copy the WAL into the main database file and truncate it.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
