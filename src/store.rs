//! Key-value cache with explicit time-to-live.
//!
//! Enriched libraries and taste summaries are cached per user so repeated
//! runs skip re-reading the export. The organizer never reaches for a global
//! cache: whoever drives it injects a [`KeyValueStore`].

use crate::error::StoreError;
use crate::track::EnrichedTrack;
use chrono::Utc;
use log::{debug, trace};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// String-keyed, string-valued store whose entries may expire.
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`, unless absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value`; `ttl` of `None` keeps it until deleted.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Reset the time-to-live of a live entry. Returns `false` if there is none.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Returns `true` if something was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).set(key, value, ttl)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        (**self).expire(key, ttl)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key)
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

/// Value plus optional deadline.
type Entry = (String, Option<Instant>);

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn live(deadline: Option<Instant>) -> bool {
    deadline.map_or(true, |at| Instant::now() < at)
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, deadline)) if live(*deadline) => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.lock()?.insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            Some((_, deadline)) if live(*deadline) => {
                *deadline = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(key).is_some())
    }
}

/// Store backed by the `kv` table. Survives restarts.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap a connection whose schema has been initialized by [`crate::db::open`].
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Drop every expired row. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let removed = self.lock()?.execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            [now_millis()],
        )?;
        debug!("Purged {removed} expired cache entries");
        Ok(removed)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn deadline_millis(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now_millis()],
                |row| row.get(0),
            )
            .optional()?;
        trace!("Cache {} for `{key}`", if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, ttl.map(deadline_millis)],
        )?;
        Ok(())
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let updated = self.lock()?.execute(
            "UPDATE kv SET expires_at = ?2
             WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?3)",
            params![key, deadline_millis(ttl), now_millis()],
        )?;
        Ok(updated > 0)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.lock()?.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }
}

/// Per-user view over a [`KeyValueStore`].
///
/// A hit is treated exactly like a fresh computation; freshness is whatever
/// the TTL guarantees and nothing more.
#[derive(Debug, Clone)]
pub struct LibraryCache<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> LibraryCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn library_key(user: &str) -> String {
        format!("{user}:library")
    }

    fn summary_key(user: &str) -> String {
        format!("{user}:summary")
    }

    fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json, Some(self.ttl))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(key)?
            .map(|json| {
                serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn store_library(&self, user: &str, tracks: &[EnrichedTrack]) -> Result<(), StoreError> {
        debug!("Caching {} enriched tracks for {user}", tracks.len());
        self.put_json(&Self::library_key(user), tracks)?;
        // A new library invalidates the summary derived from the old one.
        self.store.delete(&Self::summary_key(user))?;
        Ok(())
    }

    pub fn library(&self, user: &str) -> Result<Option<Vec<EnrichedTrack>>, StoreError> {
        self.get_json(&Self::library_key(user))
    }

    pub fn has_library(&self, user: &str) -> Result<bool, StoreError> {
        self.store.exists(&Self::library_key(user))
    }

    pub fn store_summary(&self, user: &str, summary: &str) -> Result<(), StoreError> {
        self.put_json(&Self::summary_key(user), summary)
    }

    pub fn summary(&self, user: &str) -> Result<Option<String>, StoreError> {
        self.get_json(&Self::summary_key(user))
    }

    /// Extend the lifetime of everything cached for `user`.
    pub fn touch(&self, user: &str) -> Result<(), StoreError> {
        self.store.expire(&Self::library_key(user), self.ttl)?;
        self.store.expire(&Self::summary_key(user), self.ttl)?;
        Ok(())
    }

    /// Forget everything cached for `user`.
    pub fn clear(&self, user: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::library_key(user))?;
        self.store.delete(&Self::summary_key(user))?;
        Ok(())
    }
}
