//! Organize a saved-track library into named, genre-coherent playlists.
//!
//! Core modules:
//! - [`normalize`] - Feature vectors from enriched tracks
//! - [`cluster`] - k-means over those vectors
//! - [`namer`] - Playlist labels recovered from cluster centroids
//! - [`grouping`] - Cluster and decade/genre playlist strategies
//! - [`organize`] - The pipeline tying the above together
//! - [`publish`] - Pushing playlists into a playlist sink
//!
//! ### Supporting Modules
//!
//! - [`track`] - Enriched track model and JSON loading
//! - [`genre`] - Coarse genre taxonomy and tag reduction
//! - [`analysis`] - Favourite-genre summary
//! - [`store`] - Key-value store and per-user library cache
//! - [`jobs`] - Background job runner
//! - [`db`] - SQLite schema
//! - [`config`] - Data directory and settings
//! - [`error`] - Error types
//! - [`cli`] / [`completion`] - Command-line interface
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use genrify::config::Settings;
//! use genrify::organize::{Organizer, Strategy};
//! use genrify::publish::{publish, SqliteLibrary};
//! use genrify::track::read_tracks;
//!
//! let tracks = read_tracks("library.json".as_ref())?;
//! let organizer = Organizer::new(Settings::default());
//! let grouping = organizer.grouping(Strategy::Cluster, Some(7));
//! let playlists = organizer.organize(&tracks, grouping.as_ref())?;
//!
//! let library = SqliteLibrary::new(genrify::db::open("genrify.db".as_ref())?);
//! publish(&library, "alice", &playlists, 50)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Grouping Strategies
//!
//! ### Clustering
//! Every track becomes a weighted vector of release date, genre score,
//! popularity and audio features. k-means with `k = tracks / 30 + 1` splits
//! the library and each used cluster is named from its centroid, e.g.
//! `Genrify_2_2016's Indie`.
//!
//! ### Decade and genre
//! Tracks are bucketed by release decade and dominant genre. Buckets with
//! fewer than 10 tracks are folded into a neighbouring decade of the same
//! genre, e.g. `Genrified_1990_2000s_Rock`.
//!
//! ## Error Handling
//!
//! Library modules return typed errors from [`error`]; the binary wraps them
//! in `anyhow` with context.

pub mod analysis;
pub mod cli;
pub mod cluster;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod genre;
pub mod grouping;
pub mod jobs;
pub mod namer;
pub mod normalize;
pub mod organize;
pub mod publish;
pub mod store;
pub mod track;
