//! Enriched track records as they arrive from the catalog export.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One saved track with its artist genres and audio features attached.
///
/// Audio attributes are optional at the type level because enrichment can be
/// partial; the normalizer decides which ones are required. `tempo` is never
/// consumed by the feature vector and simply defaults to `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrack {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Option<String>,
    /// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
    #[serde(alias = "album_release_date")]
    pub release_date: String,
    /// Raw artist genre tags, before reduction.
    #[serde(default)]
    pub genres: Vec<String>,
    /// 0 to 100.
    #[serde(default, alias = "popularity")]
    pub track_popularity: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub tempo: f64,
}

impl EnrichedTrack {
    /// Short human label for log lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.name, &self.artists) {
            (Some(name), Some(artists)) => format!("{name} - {artists}"),
            (Some(name), None) => name.clone(),
            _ => self.id.clone(),
        }
    }
}

/// Parse a JSON array of enriched tracks.
pub fn parse_tracks(json: &str) -> Result<Vec<EnrichedTrack>> {
    serde_json::from_str(json).context("Track export is not a JSON array of enriched tracks")
}

/// Read an enriched library export from disk.
pub fn read_tracks(path: &Path) -> Result<Vec<EnrichedTrack>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read track export at {}", path.display()))?;
    let tracks = parse_tracks(&raw)
        .with_context(|| format!("Invalid track export {}", path.display()))?;
    log::debug!("Loaded {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let json = r#"[{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "artists": "Rick Astley",
            "album_release_date": "1987-11-12",
            "genres": ["dance pop", "new wave pop"],
            "track_popularity": 77,
            "valence": 0.91,
            "danceability": 0.73,
            "energy": 0.94,
            "acousticness": 0.14,
            "liveness": 0.15,
            "tempo": 113.3
        }]"#;

        let tracks = parse_tracks(json).expect("valid export");
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.release_date, "1987-11-12");
        assert_eq!(track.track_popularity, Some(77.0));
        assert_eq!(track.genres.len(), 2);
        assert_eq!(track.display_name(), "Never Gonna Give You Up - Rick Astley");
    }

    #[test]
    fn test_missing_fields_stay_missing() {
        let json = r#"[{"id": "a", "release_date": "2001"}]"#;
        let tracks = parse_tracks(json).expect("minimal record parses");
        let track = &tracks[0];
        assert!(track.genres.is_empty());
        assert_eq!(track.valence, None);
        assert_eq!(track.tempo, 0.0);
        assert_eq!(track.display_name(), "a");
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(parse_tracks(r#"{"id": "a"}"#).is_err());
    }
}
