//! Track normalization: enriched records in, one weighted feature vector out.
//!
//! Coordinate order is fixed for a run:
//!
//! ```text
//! [date, genre, popularity, valence, danceability, energy, acousticness, (liveness)]
//! ```
//!
//! The date coordinate is the release date's position inside the batch's
//! date range, the genre coordinate is the dominant genre's score, and the
//! audio coordinates are the bounded `[0, 1]` attributes. Every coordinate is
//! scaled by its own weight so e.g. era can outweigh mood.

use crate::error::OrganizeError;
use crate::genre::{dominant_genre, resolve_categories, Genre, GenreReducer};
use crate::track::EnrichedTrack;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Per-coordinate weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub date: f64,
    pub genre: f64,
    pub popularity: f64,
    pub valence: f64,
    pub danceability: f64,
    pub energy: f64,
    pub acousticness: f64,
    /// `None` leaves the liveness coordinate out of the vector entirely.
    pub liveness: Option<f64>,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            date: 5.0,
            genre: 1.0,
            popularity: 2.5,
            valence: 2.5,
            danceability: 2.5,
            energy: 2.5,
            acousticness: 2.5,
            liveness: Some(2.5),
        }
    }
}

impl FeatureWeights {
    /// Same weights without the liveness coordinate.
    #[must_use]
    pub const fn without_liveness(self) -> Self {
        Self { liveness: None, ..self }
    }

    /// Length of every feature vector built with these weights.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        if self.liveness.is_some() {
            8
        } else {
            7
        }
    }
}

/// Earliest and latest release in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: NaiveDateTime,
    pub max: NaiveDateTime,
}

impl DateRange {
    #[must_use]
    pub fn from_dates(dates: &[NaiveDateTime]) -> Option<Self> {
        let min = dates.iter().min()?;
        let max = dates.iter().max()?;
        Some(Self { min: *min, max: *max })
    }

    fn span_seconds(&self) -> i64 {
        (self.max - self.min).num_seconds()
    }

    /// Position of `date` in the range, `0.0` at `min` and `1.0` at `max`.
    ///
    /// A range with a single distinct date maps everything to `0.0`.
    #[must_use]
    pub fn position(&self, date: NaiveDateTime) -> f64 {
        let span = self.span_seconds();
        if span == 0 {
            return 0.0;
        }
        (date - self.min).num_seconds() as f64 / span as f64
    }

    /// Inverse of [`DateRange::position`].
    ///
    /// Fractions outside `[0, 1]` extrapolate; values chrono cannot represent
    /// saturate at the nearer end of the range.
    #[must_use]
    pub fn at_position(&self, fraction: f64) -> NaiveDateTime {
        if !fraction.is_finite() {
            return self.min;
        }
        let offset = (fraction * self.span_seconds() as f64).round();
        let saturated = if fraction < 0.0 { self.min } else { self.max };
        if offset.abs() >= i64::MAX as f64 / 1000.0 {
            return saturated;
        }
        TimeDelta::try_seconds(offset as i64)
            .and_then(|delta| self.min.checked_add_signed(delta))
            .unwrap_or(saturated)
    }
}

/// Parse a release date at day, month or year granularity.
///
/// The format is picked by string length (10 → `YYYY-MM-DD`, 7 → `YYYY-MM`,
/// anything else → `YYYY`). Missing month/day parts become the first one.
#[must_use]
pub fn parse_release_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let full = match raw.len() {
        10 => raw.to_string(),
        7 => format!("{raw}-01"),
        _ => format!("{raw}-01-01"),
    };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// One track after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrack {
    pub id: String,
    /// Parsed release date, or the run's "now" when parsing failed.
    pub released: NaiveDateTime,
    pub genre: Genre,
    pub features: Vec<f64>,
}

/// Feature matrix for a run plus what is needed to invert it.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub tracks: Vec<NormalizedTrack>,
    pub dates: DateRange,
    pub weights: FeatureWeights,
}

impl NormalizedBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.weights.dimensions()
    }

    /// Feature vectors in track order.
    #[must_use]
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.tracks.iter().map(|t| t.features.clone()).collect()
    }
}

fn required(
    track: &EnrichedTrack,
    value: Option<f64>,
    field: &'static str,
) -> Result<f64, OrganizeError> {
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| OrganizeError::IncompleteEnrichment {
            track_id: track.id.clone(),
            field,
        })
}

/// Audio coordinates, unweighted and already in `[0, 1]`.
fn audio_attributes(
    track: &EnrichedTrack,
    weights: &FeatureWeights,
) -> Result<Vec<(f64, f64)>, OrganizeError> {
    let mut attributes = vec![
        (required(track, track.track_popularity, "track_popularity")? / 100.0, weights.popularity),
        (required(track, track.valence, "valence")?, weights.valence),
        (required(track, track.danceability, "danceability")?, weights.danceability),
        (required(track, track.energy, "energy")?, weights.energy),
        (required(track, track.acousticness, "acousticness")?, weights.acousticness),
    ];
    if let Some(weight) = weights.liveness {
        attributes.push((required(track, track.liveness, "liveness")?, weight));
    }
    Ok(attributes)
}

/// Normalize a batch against the current time.
pub fn normalize<R>(
    tracks: &[EnrichedTrack],
    weights: &FeatureWeights,
    reducer: &R,
) -> Result<NormalizedBatch, OrganizeError>
where
    R: GenreReducer + ?Sized,
{
    normalize_at(tracks, weights, reducer, Utc::now().naive_utc())
}

/// Normalize a batch, substituting `now` for unparseable release dates.
///
/// Fails as a whole when any track lacks a required attribute; no track is
/// ever dropped from the output.
pub fn normalize_at<R>(
    tracks: &[EnrichedTrack],
    weights: &FeatureWeights,
    reducer: &R,
    now: NaiveDateTime,
) -> Result<NormalizedBatch, OrganizeError>
where
    R: GenreReducer + ?Sized,
{
    if tracks.is_empty() {
        return Err(OrganizeError::EmptyLibrary);
    }

    let audio = tracks
        .iter()
        .map(|track| audio_attributes(track, weights))
        .collect::<Result<Vec<_>, _>>()?;

    let released: Vec<NaiveDateTime> = tracks
        .iter()
        .map(|track| {
            parse_release_date(&track.release_date).unwrap_or_else(|| {
                debug!(
                    "Unparseable release date `{}` for track {}, using now",
                    track.release_date, track.id
                );
                now
            })
        })
        .collect();
    let dates = DateRange::from_dates(&released).ok_or(OrganizeError::EmptyLibrary)?;
    debug!(
        "Normalizing {} tracks released between {} and {}",
        tracks.len(),
        dates.min.date(),
        dates.max.date()
    );

    let normalized = tracks
        .iter()
        .zip(released)
        .zip(audio)
        .map(|((track, released), audio)| {
            let genre = dominant_genre(&resolve_categories(&track.genres, reducer));
            let genre_score = f64::from(genre.score()) * weights.genre;

            let mut features = Vec::with_capacity(weights.dimensions());
            features.push(dates.position(released) * weights.date);
            features.push(if genre_score.is_nan() { 0.0 } else { genre_score });
            features.extend(audio.into_iter().map(|(value, weight)| value * weight));
            trace!("Track {} -> {:?}", track.display_name(), features);

            NormalizedTrack {
                id: track.id.clone(),
                released,
                genre,
                features,
            }
        })
        .collect();

    Ok(NormalizedBatch {
        tracks: normalized,
        dates,
        weights: *weights,
    })
}
