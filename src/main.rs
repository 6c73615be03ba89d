//! # Genrify
//!
//! Turns a user's saved-track library, already enriched with genre tags and
//! audio features, into named playlists. Tracks are grouped either by
//! k-means clustering or by decade and dominant genre, then published to the
//! local playlist library in the data directory.
//!
//! ## Usage
//!
//! ```bash
//! genrify import library.json --user alice
//! genrify analyze --user alice
//! genrify organize --user alice --strategy cluster
//! genrify playlists --user alice
//! genrify delete --user alice
//! ```
//!
//! ## Logging
//!
//! Controlled via `RUST_LOG`:
//! - `RUST_LOG=debug genrify organize -u alice` - Enable debug logging
//! - `RUST_LOG=genrify::grouping=debug genrify organize -u alice` - Merge decisions only

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use genrify::analysis::taste_summary;
use genrify::cli::{self, Command};
use genrify::completion;
use genrify::config::RuntimeConfig;
use genrify::db;
use genrify::jobs::{JobKind, JobRunner, JobStatus};
use genrify::organize::{Organizer, Strategy};
use genrify::publish::{self, is_generated_playlist, PlaylistSink, SqliteLibrary};
use genrify::store::{LibraryCache, SqliteStore};
use genrify::track::{read_tracks, EnrichedTrack};
use log::{debug, info};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Cache = LibraryCache<SqliteStore>;

struct App {
    config: RuntimeConfig,
    cache: Arc<Cache>,
    runner: JobRunner,
}

impl App {
    fn open(config: RuntimeConfig) -> Result<Self> {
        let store = SqliteStore::new(db::open(&config.db_path)?);
        store.purge_expired()?;
        let cache = Arc::new(LibraryCache::new(store, config.settings.cache_ttl()));
        let runner = JobRunner::new(config.settings.worker_threads)?;
        Ok(Self { config, cache, runner })
    }

    fn library(&self) -> Result<SqliteLibrary> {
        Ok(SqliteLibrary::new(db::open(&self.config.db_path)?))
    }

    /// Tracks from `input`, or from the cache when no file is given.
    fn tracks(&self, user: &str, input: Option<&Path>) -> Result<Vec<EnrichedTrack>> {
        if let Some(path) = input {
            return read_tracks(path);
        }
        match self.cache.library(user)? {
            Some(tracks) => {
                self.cache.touch(user)?;
                Ok(tracks)
            }
            None => bail!(
                "No library cached for {user}. Run `genrify import <file> --user {user}` first."
            ),
        }
    }

    /// Submit and block until the job finishes; failures become errors.
    fn run_job<F>(&self, kind: JobKind, user: &str, task: F) -> Result<String>
    where
        F: FnOnce() -> Result<String> + Send + 'static,
    {
        let id = self.runner.submit(kind, user, task);
        let status = self.runner.wait(id);
        self.runner.forget(id);
        match status {
            Some(JobStatus::Completed(message)) => Ok(message),
            Some(JobStatus::Failed(reason)) => bail!("{kind} failed: {reason}"),
            Some(JobStatus::Pending) | None => bail!("{kind} job {id} was lost"),
        }
    }

    fn import(&self, file: PathBuf, user: String) -> Result<String> {
        let cache = Arc::clone(&self.cache);
        let owner = user.clone();
        self.run_job(JobKind::Import, &user, move || {
            let tracks = read_tracks(&file)?;
            cache.store_library(&owner, &tracks)?;
            Ok(format!("Imported {} tracks for {owner}", tracks.len()))
        })
    }

    fn analyze(&self, user: String, input: Option<PathBuf>) -> Result<String> {
        if input.is_none() {
            if let Some(summary) = self.cache.summary(&user)? {
                debug!("Taste summary for {user} served from cache");
                return Ok(summary);
            }
        }
        let tracks = self.tracks(&user, input.as_deref())?;
        let cache = Arc::clone(&self.cache);
        let cached = input.is_none();
        let owner = user.clone();
        self.run_job(JobKind::Analyze, &user, move || {
            let summary = taste_summary(&tracks, &genrify::genre::KeywordReducer);
            if cached {
                cache.store_summary(&owner, &summary)?;
            }
            Ok(summary)
        })
    }

    fn organize(
        &self,
        user: String,
        input: Option<PathBuf>,
        strategy: Strategy,
        seed: Option<u64>,
        dry_run: bool,
    ) -> Result<String> {
        let tracks = self.tracks(&user, input.as_deref())?;
        let organizer = Organizer::new(self.config.settings.clone());
        let library = if dry_run { None } else { Some(self.library()?) };
        let owner = user.clone();
        self.run_job(JobKind::Organize, &user, move || {
            let grouping = organizer.grouping(strategy, seed);
            let playlists = organizer.organize(&tracks, grouping.as_ref())?;
            let Some(library) = library else {
                return Ok(serde_json::to_string_pretty(&playlists)?);
            };
            publish::publish(&library, &owner, &playlists, organizer.settings().batch_size)?;
            let lines: Vec<String> = playlists
                .iter()
                .map(|p| format!("{} ({} tracks)", p.name, p.len()))
                .collect();
            Ok(format!("Created {} playlists:\n{}", playlists.len(), lines.join("\n")))
        })
    }

    fn playlists(&self, user: &str) -> Result<String> {
        let playlists = self.library()?.list_playlists(user)?;
        if playlists.is_empty() {
            return Ok(format!("No playlists for {user}"));
        }
        let lines: Vec<String> = playlists
            .iter()
            .map(|p| {
                let marker = if is_generated_playlist(&p.name) { "*" } else { " " };
                format!("{marker} {:<40} {:>5} tracks  [{}]", p.name, p.tracks, p.id)
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn delete(&self, user: String) -> Result<String> {
        let library = self.library()?;
        let owner = user.clone();
        self.run_job(JobKind::Delete, &user, move || {
            let removed = publish::delete_generated(&library, &owner)?;
            Ok(format!("Deleted {removed} generated playlists"))
        })
    }

    fn forget(&self, user: &str) -> Result<String> {
        self.cache.clear(user)?;
        Ok(format!("Forgot cached data for {user}"))
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    let data_dir = args.data_dir;
    let open_app = || -> Result<App> {
        let config =
            RuntimeConfig::load(data_dir.as_deref()).context("Failed to load configuration")?;
        info!("Using data directory {}", config.data_dir.display());
        App::open(config)
    };

    let output = match args.command {
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::write_completions(
                completion::shell_to_completion_shell(shell),
                &mut cmd,
                &mut io::stdout(),
            );
            return Ok(());
        }
        Command::Import { file, user } => open_app()?.import(file, user)?,
        Command::Analyze { user, input } => open_app()?.analyze(user, input)?,
        Command::Organize { user, input, strategy, seed, dry_run } => {
            open_app()?.organize(user, input, strategy, seed, dry_run)?
        }
        Command::Playlists { user } => open_app()?.playlists(&user)?,
        Command::Delete { user } => open_app()?.delete(user)?,
        Command::Forget { user } => open_app()?.forget(&user)?,
    };
    println!("{output}");

    Ok(())
}
