//! Materializing generated playlists through a [`PlaylistSink`].
//!
//! The sink stands in for the music service's playlist API. It is called
//! once per playlist to create it and then once per batch of at most
//! [`MAX_BATCH`] track ids. Errors are surfaced as-is; retrying is the
//! sink's business.

use crate::error::{PublishError, StoreError};
use crate::grouping::{Playlist, CLUSTER_PREFIX, DECADE_PREFIX, MAX_BATCH};
use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::Mutex;

/// A playlist as the sink lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub tracks: usize,
}

/// Where playlists end up.
pub trait PlaylistSink: Send + Sync {
    /// Create an empty private playlist and return its id.
    fn create_playlist(&self, owner: &str, name: &str) -> Result<String, PublishError>;

    /// Append up to [`MAX_BATCH`] tracks to a playlist.
    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), PublishError>;

    fn list_playlists(&self, owner: &str) -> Result<Vec<PlaylistSummary>, PublishError>;

    fn remove_playlist(&self, owner: &str, playlist_id: &str) -> Result<(), PublishError>;
}

/// Create every playlist, then fill each one batch by batch.
///
/// Returns the sink's playlist ids in the order of `playlists`. The first
/// sink failure aborts the run.
pub fn publish<S>(
    sink: &S,
    owner: &str,
    playlists: &[Playlist],
    batch_size: usize,
) -> Result<Vec<String>, PublishError>
where
    S: PlaylistSink + ?Sized,
{
    let ids = playlists
        .iter()
        .map(|playlist| {
            let id = sink.create_playlist(owner, &playlist.name)?;
            info!("Created playlist {} ({} tracks)", playlist.name, playlist.len());
            Ok::<_, PublishError>(id)
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (playlist, id) in playlists.iter().zip(&ids) {
        for batch in playlist.batches(batch_size) {
            debug!("Adding {} tracks to {}", batch.len(), playlist.name);
            sink.add_tracks(id, batch)?;
        }
    }
    Ok(ids)
}

/// Remove every generated playlist the owner has. Returns how many went.
pub fn delete_generated<S>(sink: &S, owner: &str) -> Result<usize, PublishError>
where
    S: PlaylistSink + ?Sized,
{
    let generated: Vec<PlaylistSummary> = sink
        .list_playlists(owner)?
        .into_iter()
        .filter(|p| is_generated_playlist(&p.name))
        .collect();
    for playlist in &generated {
        sink.remove_playlist(owner, &playlist.id)?;
    }
    info!("Deleted {} generated playlists for {owner}", generated.len());
    Ok(generated.len())
}

/// Local playlist library kept in the `playlist`/`playlist_track` tables.
///
/// Enforces the same 50-track batch limit as the remote API.
#[derive(Debug)]
pub struct SqliteLibrary {
    conn: Mutex<Connection>,
}

impl SqliteLibrary {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PublishError> {
        self.conn.lock().map_err(|_| PublishError::Store(StoreError::Poisoned))
    }

    fn parse_id(playlist_id: &str) -> Result<i64, PublishError> {
        playlist_id
            .parse()
            .map_err(|_| PublishError::UnknownPlaylist(playlist_id.to_string()))
    }

    /// Track ids of a stored playlist, in order.
    pub fn tracks(&self, playlist_id: &str) -> Result<Vec<String>, PublishError> {
        let id = Self::parse_id(playlist_id)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT track_id FROM playlist_track WHERE playlist_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([id], |row| row.get(0))?;
        let mut tracks = Vec::new();
        for row in rows {
            tracks.push(row?);
        }
        Ok(tracks)
    }
}

impl PlaylistSink for SqliteLibrary {
    fn create_playlist(&self, owner: &str, name: &str) -> Result<String, PublishError> {
        if name.trim().is_empty() {
            return Err(PublishError::Rejected {
                name: name.to_string(),
                reason: "empty playlist name".to_string(),
            });
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO playlist (owner, name, created_at) VALUES (?1, ?2, ?3)",
            params![owner, name, Utc::now().timestamp()],
        )?;
        Ok(conn.last_insert_rowid().to_string())
    }

    fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), PublishError> {
        if track_ids.len() > MAX_BATCH {
            return Err(PublishError::BatchTooLarge {
                len: track_ids.len(),
                max: MAX_BATCH,
            });
        }
        let id = Self::parse_id(playlist_id)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let exists: Option<i64> = tx
                .query_row("SELECT id FROM playlist WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Err(PublishError::UnknownPlaylist(playlist_id.to_string()));
            }
            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_track WHERE playlist_id = ?1",
                [id],
                |row| row.get(0),
            )?;
            let mut stmt = tx.prepare(
                "INSERT INTO playlist_track (playlist_id, position, track_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (offset, track_id) in (0_i64..).zip(track_ids) {
                stmt.execute(params![id, next + offset, track_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_playlists(&self, owner: &str) -> Result<Vec<PlaylistSummary>, PublishError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, COUNT(t.track_id)
             FROM playlist p LEFT JOIN playlist_track t ON t.playlist_id = p.id
             WHERE p.owner = ?1
             GROUP BY p.id ORDER BY p.id",
        )?;
        let rows = stmt.query_map([owner], |row| {
            Ok(PlaylistSummary {
                id: row.get::<_, i64>(0)?.to_string(),
                name: row.get(1)?,
                tracks: row.get::<_, i64>(2)?.try_into().unwrap_or(0),
            })
        })?;
        let mut playlists = Vec::new();
        for row in rows {
            playlists.push(row?);
        }
        Ok(playlists)
    }

    fn remove_playlist(&self, owner: &str, playlist_id: &str) -> Result<(), PublishError> {
        let id = Self::parse_id(playlist_id)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM playlist_track WHERE playlist_id = ?1", [id])?;
        let removed = tx.execute(
            "DELETE FROM playlist WHERE id = ?1 AND owner = ?2",
            params![id, owner],
        )?;
        if removed == 0 {
            return Err(PublishError::UnknownPlaylist(playlist_id.to_string()));
        }
        tx.commit()?;
        Ok(())
    }
}

/// `true` for names produced by the clustering strategy.
#[must_use]
pub fn is_cluster_playlist(name: &str) -> bool {
    name.starts_with(CLUSTER_PREFIX)
}

/// `true` for names produced by either strategy (`Genrify_…` or `Genrified_…`).
#[must_use]
pub fn is_generated_playlist(name: &str) -> bool {
    is_cluster_playlist(name) || name.starts_with(DECADE_PREFIX)
}
