//! SQLite schema shared by the cache and the local playlist library.

use crate::error::StoreError;
use log::debug;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS kv (
        key        TEXT PRIMARY KEY,
        value      TEXT    NOT NULL,
        expires_at INTEGER
    );
    CREATE TABLE IF NOT EXISTS playlist (
        id         INTEGER PRIMARY KEY,
        owner      TEXT    NOT NULL,
        name       TEXT    NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS playlist_track (
        playlist_id INTEGER NOT NULL REFERENCES playlist(id) ON DELETE CASCADE,
        position    INTEGER NOT NULL,
        track_id    TEXT    NOT NULL,
        PRIMARY KEY (playlist_id, position)
    );
    CREATE INDEX IF NOT EXISTS idx_playlist_owner ON playlist(owner);
";

/// Open (creating if needed) the database at `path` and make sure the schema exists.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    debug!("Opening database at {}", path.display());
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Private in-memory database, mostly for tests.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
