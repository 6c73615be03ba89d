//! Typed failures raised by the organizing core.
//!
//! The CLI wraps these in `anyhow` with extra context; library callers can
//! match on the variants to mark a run as errored and log which track or
//! stage was at fault.

use thiserror::Error;

/// Failure while turning an enriched library into playlists.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("No tracks to organize")]
    EmptyLibrary,

    #[error("Incomplete enrichment: track `{track_id}` has no usable `{field}`")]
    IncompleteEnrichment {
        track_id: String,
        field: &'static str,
    },

    #[error("Feature matrix is ragged: row {row} has {found} coordinates, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl OrganizeError {
    /// Pipeline stage the failure belongs to.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            OrganizeError::EmptyLibrary | OrganizeError::IncompleteEnrichment { .. } => "normalize",
            OrganizeError::RaggedMatrix { .. } => "cluster",
        }
    }

    /// Offending track, when the failure is tied to one.
    #[must_use]
    pub fn track_id(&self) -> Option<&str> {
        match self {
            OrganizeError::IncompleteEnrichment { track_id, .. } => Some(track_id),
            _ => None,
        }
    }
}

/// Failure in the key-value cache or the local playlist database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cached value for `{key}` is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not serialize value for `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Failure reported by a playlist sink while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Playlist `{name}` was rejected: {reason}")]
    Rejected { name: String, reason: String },

    #[error("Batch of {len} tracks exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Unknown playlist id `{0}`")]
    UnknownPlaylist(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for PublishError {
    fn from(err: rusqlite::Error) -> Self {
        PublishError::Store(StoreError::Sqlite(err))
    }
}
