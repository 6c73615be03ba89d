//! # Integration Tests for Genrify
//!
//! End-to-end runs of the library pipeline against an on-disk database, plus
//! a few invocations of the compiled binary with a throwaway data directory.

use anyhow::Result;
use genrify::track::EnrichedTrack;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const TAGS: [&str; 6] = ["indie rock", "deep house", "bebop", "dance pop", "trap", "bluegrass"];

/// Reproducible library of `count` fully enriched tracks.
fn sample_library(count: usize, seed: u64) -> Vec<EnrichedTrack> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| EnrichedTrack {
            id: format!("track{i:03}"),
            name: Some(format!("Song {i}")),
            artists: Some(format!("Artist {}", i % 7)),
            release_date: format!(
                "{}-{:02}-15",
                1965 + rng.gen_range(0..58),
                rng.gen_range(1..=12)
            ),
            genres: vec![TAGS[i % TAGS.len()].to_string()],
            track_popularity: Some(rng.gen_range(0.0..100.0)),
            valence: Some(rng.gen()),
            danceability: Some(rng.gen()),
            energy: Some(rng.gen()),
            acousticness: Some(rng.gen()),
            liveness: Some(rng.gen()),
            tempo: rng.gen_range(60.0..180.0),
        })
        .collect()
}

fn write_library(dir: &Path, tracks: &[EnrichedTrack]) -> Result<PathBuf> {
    let path = dir.join("library.json");
    std::fs::write(&path, serde_json::to_string(tracks)?)?;
    Ok(path)
}

fn sorted_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.cloned().collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use genrify::config::Settings;
    use genrify::db;
    use genrify::organize::{Organizer, Strategy};
    use genrify::publish::{delete_generated, publish, PlaylistSink, SqliteLibrary};

    #[test]
    fn test_cluster_playlists_are_published_in_batches() -> Result<()> {
        let temp = TempDir::new()?;
        let library = SqliteLibrary::new(db::open(&temp.path().join("genrify.db"))?);
        let tracks = sample_library(130, 21);

        let organizer = Organizer::new(Settings::default());
        let grouping = organizer.grouping(Strategy::Cluster, Some(5));
        let playlists = organizer.organize(&tracks, grouping.as_ref())?;
        assert!(playlists.len() <= 5);

        let ids = publish(&library, "alice", &playlists, 50)?;
        assert_eq!(ids.len(), playlists.len());

        let mut published = Vec::new();
        for (playlist, id) in playlists.iter().zip(&ids) {
            let stored = library.tracks(id)?;
            assert_eq!(stored, playlist.track_ids);
            published.extend(stored);
        }
        assert_eq!(sorted_ids(published.iter()), sorted_ids(tracks.iter().map(|t| &t.id)));
        Ok(())
    }

    #[test]
    fn test_decade_playlists_skip_nothing_but_others() -> Result<()> {
        let mut tracks = sample_library(60, 8);
        tracks[0].genres = vec!["sea shanty".to_string()];

        let organizer = Organizer::new(Settings::default());
        let grouping = organizer.grouping(Strategy::Decade, None);
        let playlists = organizer.organize(&tracks, grouping.as_ref())?;

        let grouped = sorted_ids(playlists.iter().flat_map(|p| p.track_ids.iter()));
        let expected = sorted_ids(tracks[1..].iter().map(|t| &t.id));
        assert_eq!(grouped, expected);
        assert!(playlists.iter().all(|p| p.name.starts_with("Genrified_")));
        Ok(())
    }

    #[test]
    fn test_delete_only_touches_generated_playlists() -> Result<()> {
        let temp = TempDir::new()?;
        let library = SqliteLibrary::new(db::open(&temp.path().join("genrify.db"))?);
        library.create_playlist("alice", "Road trip")?;
        library.create_playlist("bob", "Genrify_1_1999's Rock")?;

        let tracks = sample_library(40, 2);
        let organizer = Organizer::new(Settings::default());
        let grouping = organizer.grouping(Strategy::Cluster, Some(1));
        let playlists = organizer.organize(&tracks, grouping.as_ref())?;
        publish(&library, "alice", &playlists, 50)?;

        assert_eq!(delete_generated(&library, "alice")?, playlists.len());
        let left: Vec<String> = library
            .list_playlists("alice")?
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(left, vec!["Road trip".to_string()]);
        assert_eq!(library.list_playlists("bob")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_incomplete_library_publishes_nothing() -> Result<()> {
        let mut tracks = sample_library(20, 4);
        tracks[7].danceability = None;

        let organizer = Organizer::new(Settings::default());
        let grouping = organizer.grouping(Strategy::Cluster, Some(1));
        let err = organizer.organize(&tracks, grouping.as_ref()).unwrap_err();
        assert_eq!(err.track_id(), Some("track007"));
        Ok(())
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use genrify::analysis::taste_summary;
    use genrify::db;
    use genrify::genre::KeywordReducer;
    use genrify::store::{LibraryCache, SqliteStore};
    use std::time::Duration;

    #[test]
    fn test_library_survives_reopening() -> Result<()> {
        let temp = TempDir::new()?;
        let db_path = temp.path().join("genrify.db");
        let tracks = sample_library(12, 3);

        let ttl = Duration::from_secs(60);
        {
            let cache = LibraryCache::new(SqliteStore::new(db::open(&db_path)?), ttl);
            cache.store_library("alice", &tracks)?;
            cache.store_summary("alice", &taste_summary(&tracks, &KeywordReducer))?;
        }

        let cache = LibraryCache::new(SqliteStore::new(db::open(&db_path)?), ttl);
        assert_eq!(cache.library("alice")?, Some(tracks));
        assert!(cache.summary("alice")?.is_some());
        assert_eq!(cache.library("bob")?, None);

        cache.clear("alice")?;
        assert!(!cache.has_library("alice")?);
        assert_eq!(cache.summary("alice")?, None);
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn genrify(data_dir: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_genrify"))
            .arg("--data-dir")
            .arg(data_dir)
            .args(args)
            .output()
            .expect("Failed to run genrify")
    }

    fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let temp = TempDir::new().unwrap();
        let output = genrify(temp.path(), &["--help"]);
        let text = stdout(&output);
        assert!(text.contains("genrify"));
        assert!(text.contains("import"));
        assert!(text.contains("organize"));
        assert!(text.contains("forget"));
    }

    #[test]
    fn test_completion_generation() {
        let temp = TempDir::new().unwrap();
        let output = genrify(temp.path(), &["completion", "bash"]);
        assert!(output.status.success());
        let text = stdout(&output);
        assert!(text.contains("_genrify"));
        assert!(text.contains("complete"));
    }

    #[test]
    fn test_import_analyze_organize_delete() -> Result<()> {
        let temp = TempDir::new()?;
        let file = write_library(temp.path(), &sample_library(70, 13))?;
        let file = file.to_string_lossy().into_owned();

        let output = genrify(temp.path(), &["import", &file, "--user", "alice"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("Imported 70 tracks"));

        let output = genrify(temp.path(), &["analyze", "--user", "alice"]);
        assert!(output.status.success());
        assert!(stdout(&output).starts_with("Hi! Favorite genres are"));

        let output = genrify(temp.path(), &["organize", "--user", "alice", "--seed", "4"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("Genrify_"));

        let output = genrify(temp.path(), &["playlists", "--user", "alice"]);
        assert!(stdout(&output).contains("Genrify_"));

        let output = genrify(temp.path(), &["delete", "--user", "alice"]);
        assert!(output.status.success());
        assert!(stdout(&output).starts_with("Deleted"));

        let output = genrify(temp.path(), &["playlists", "--user", "alice"]);
        assert!(stdout(&output).contains("No playlists for alice"));
        Ok(())
    }

    #[test]
    fn test_delete_removes_decade_playlists() -> Result<()> {
        let temp = TempDir::new()?;
        let file = write_library(temp.path(), &sample_library(60, 17))?;
        let file = file.to_string_lossy().into_owned();

        assert!(genrify(temp.path(), &["import", &file, "--user", "frank"]).status.success());
        let output = genrify(temp.path(), &["organize", "--user", "frank", "--strategy", "decade"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("Genrified_"));

        let output = genrify(temp.path(), &["delete", "--user", "frank"]);
        assert!(output.status.success());
        assert!(!stdout(&output).starts_with("Deleted 0 "));

        let output = genrify(temp.path(), &["playlists", "--user", "frank"]);
        assert!(stdout(&output).contains("No playlists for frank"));
        Ok(())
    }

    #[test]
    fn test_dry_run_prints_plan() -> Result<()> {
        let temp = TempDir::new()?;
        let file = write_library(temp.path(), &sample_library(30, 6))?;
        let file = file.to_string_lossy().into_owned();

        let output = genrify(
            temp.path(),
            &["organize", "--user", "carol", "--input", &file, "--strategy", "decade", "--dry-run"],
        );
        assert!(output.status.success());
        let plan: serde_json::Value = serde_json::from_str(&stdout(&output))?;
        assert!(plan.as_array().is_some_and(|p| !p.is_empty()));

        let output = genrify(temp.path(), &["playlists", "--user", "carol"]);
        assert!(stdout(&output).contains("No playlists for carol"));
        Ok(())
    }

    #[test]
    fn test_organize_without_library_fails() {
        let temp = TempDir::new().unwrap();
        let output = genrify(temp.path(), &["organize", "--user", "nobody"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("No library cached"));
    }

    #[test]
    fn test_forget_drops_cached_library() -> Result<()> {
        let temp = TempDir::new()?;
        let file = write_library(temp.path(), &sample_library(10, 1))?;
        let file = file.to_string_lossy().into_owned();

        assert!(genrify(temp.path(), &["import", &file, "-u", "dave"]).status.success());
        assert!(genrify(temp.path(), &["forget", "-u", "dave"]).status.success());
        assert!(!genrify(temp.path(), &["analyze", "-u", "dave"]).status.success());
        Ok(())
    }
}
