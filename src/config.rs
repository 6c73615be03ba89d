//! # Configuration Module
//!
//! Data directory location and tunable settings.
//!
//! ## Data Storage
//!
//! Genrify keeps its SQLite database (cache and local playlists) and an
//! optional `settings.json` in the platform-standard data directory:
//! - Linux: `~/.local/share/genrify/`
//! - macOS: `~/Library/Application Support/genrify/`
//! - Windows: `%APPDATA%\genrify\`
//!
//! `--data-dir` (or `GENRIFY_DATA_DIR`) overrides the location.
//!
//! ## Settings
//!
//! Every field of [`Settings`] is optional in `settings.json`; missing fields
//! take their defaults. Example:
//!
//! ```json
//! { "weights": { "date": 4.0, "liveness": null }, "cluster_size": 25 }
//! ```

use crate::cluster::{DEFAULT_CLUSTER_SIZE, DEFAULT_MAX_ITERATIONS};
use crate::grouping::{DEFAULT_MERGE_THRESHOLD, MAX_BATCH};
use crate::normalize::FeatureWeights;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "genrify";
const DB_FILE: &str = "genrify.db";
const SETTINGS_FILE: &str = "settings.json";

/// Returns the data directory, creating it if needed.
///
/// `override_dir` wins over the platform default.
///
/// # Errors
///
/// Fails if no platform data directory is known or the directory cannot be
/// created.
pub fn get_data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Could not determine system data directory. \
                     Pass --data-dir or set GENRIFY_DATA_DIR."
                )
            })?
            .join(APP_DIR),
    };
    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "Failed to create Genrify data directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir)
}

/// Tunables for normalization, clustering, grouping and caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub weights: FeatureWeights,
    /// Target average playlist size; k = tracks / cluster_size + 1.
    pub cluster_size: usize,
    pub max_iterations: usize,
    /// Decade/genre groups smaller than this get merged.
    pub merge_threshold: usize,
    /// Tracks per add call, never above 50.
    pub batch_size: usize,
    pub cache_ttl_secs: u64,
    pub worker_threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weights: FeatureWeights::default(),
            cluster_size: DEFAULT_CLUSTER_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            batch_size: MAX_BATCH,
            cache_ttl_secs: 30 * 60,
            worker_threads: 2,
        }
    }
}

impl Settings {
    /// Read `settings.json` from `data_dir`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Clamp values the rest of the pipeline cannot work with.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH {
            warn!("batch_size {} out of range, using {MAX_BATCH}", self.batch_size);
            self.batch_size = MAX_BATCH;
        }
        if self.cluster_size == 0 {
            warn!("cluster_size must be positive, using {DEFAULT_CLUSTER_SIZE}");
            self.cluster_size = DEFAULT_CLUSTER_SIZE;
        }
        if self.max_iterations > DEFAULT_MAX_ITERATIONS {
            warn!("max_iterations capped at {DEFAULT_MAX_ITERATIONS}");
            self.max_iterations = DEFAULT_MAX_ITERATIONS;
        }
        self.worker_threads = self.worker_threads.max(1);
        self
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Resolved paths plus settings for one invocation.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub settings: Settings,
}

impl RuntimeConfig {
    /// Resolve the data directory and load settings from it.
    ///
    /// # Errors
    ///
    /// See [`get_data_dir`] and [`Settings::load`].
    pub fn load(override_dir: Option<&Path>) -> Result<Self> {
        let data_dir = get_data_dir(override_dir)?;
        let settings = Settings::load(&data_dir)?;
        Ok(Self {
            db_path: data_dir.join(DB_FILE),
            data_dir,
            settings,
        })
    }
}
