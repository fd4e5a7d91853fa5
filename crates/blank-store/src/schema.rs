use rusqlite::Connection;

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Fold any WAL left by an unclean exit into the main file.
    // In-memory and fresh databases legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entries (
            id               TEXT PRIMARY KEY,
            author_id        TEXT NOT NULL,
            text             TEXT NOT NULL,
            tier             INTEGER NOT NULL CHECK (tier BETWEEN 0 AND 3),
            measured_balance REAL NOT NULL,
            is_core_memory   INTEGER NOT NULL DEFAULT 0,
            status           TEXT NOT NULL DEFAULT 'pending'
                             CHECK (status IN ('pending', 'approved', 'rejected')),
            cycle_number     INTEGER NOT NULL CHECK (cycle_number >= 1),
            created_at       TEXT NOT NULL,
            annotation       TEXT,
            CHECK (is_core_memory = 0 OR tier = 3)
        );

        CREATE TABLE IF NOT EXISTS syntheses (
            cycle_number            INTEGER PRIMARY KEY,
            narrative_text          TEXT NOT NULL,
            source_submission_count INTEGER NOT NULL,
            generated_at            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS drafts (
            id           TEXT PRIMARY KEY,
            text         TEXT NOT NULL,
            kind         TEXT NOT NULL,
            cycle_number INTEGER NOT NULL,
            status       TEXT NOT NULL DEFAULT 'draft'
                         CHECK (status IN ('draft', 'approved', 'posted', 'deleted')),
            created_at   TEXT NOT NULL,
            posted_at    TEXT
        );

        CREATE TABLE IF NOT EXISTS waking_entries (
            id           TEXT PRIMARY KEY,
            cycle_number INTEGER NOT NULL,
            first_post   TEXT NOT NULL,
            second_post  TEXT,
            status       TEXT NOT NULL DEFAULT 'posted',
            posted_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_author_cycle ON entries(author_id, cycle_number);
        CREATE INDEX IF NOT EXISTS idx_entries_status_cycle ON entries(status, cycle_number);
        CREATE INDEX IF NOT EXISTS idx_entries_core ON entries(is_core_memory, status);
        CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts(status);

        CREATE TRIGGER IF NOT EXISTS entries_text_frozen
        BEFORE UPDATE OF text ON entries
        WHEN OLD.status != 'pending' AND NEW.text != OLD.text
        BEGIN
            SELECT RAISE(ABORT, 'entry text is immutable once moderated');
        END;
        ",
    )?;

    if let Some(found) = get_schema_version(conn)?
        && found > SCHEMA_VERSION
    {
        return Err(StoreError::InvalidData(format!(
            "database schema version {found} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
