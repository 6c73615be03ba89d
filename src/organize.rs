//! Library organizing pipeline: normalize, then group.

use crate::config::Settings;
use crate::error::OrganizeError;
use crate::genre::{GenreReducer, KeywordReducer};
use crate::grouping::{ClusterGrouping, DecadeGenreGrouping, Playlist, PlaylistGroupingStrategy};
use crate::normalize::normalize;
use crate::track::EnrichedTrack;
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which grouping a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// k-means over audio features, release date and genre
    #[default]
    Cluster,
    /// Exact decade and dominant genre buckets
    Decade,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Cluster => f.write_str("cluster"),
            Strategy::Decade => f.write_str("decade"),
        }
    }
}

/// Runs the whole pipeline with one set of settings and one genre reducer.
#[derive(Clone)]
pub struct Organizer {
    settings: Settings,
    reducer: Arc<dyn GenreReducer>,
}

impl Organizer {
    pub fn new(settings: Settings) -> Self {
        Self::with_reducer(settings, Arc::new(KeywordReducer))
    }

    pub fn with_reducer(settings: Settings, reducer: Arc<dyn GenreReducer>) -> Self {
        Self { settings, reducer }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reducer(&self) -> &dyn GenreReducer {
        self.reducer.as_ref()
    }

    /// Grouping for `strategy`; `seed` fixes k-means initialization.
    pub fn grouping(
        &self,
        strategy: Strategy,
        seed: Option<u64>,
    ) -> Box<dyn PlaylistGroupingStrategy> {
        match strategy {
            Strategy::Cluster => Box::new(ClusterGrouping {
                cluster_size: self.settings.cluster_size,
                max_iterations: self.settings.max_iterations,
                seed,
            }),
            Strategy::Decade => Box::new(DecadeGenreGrouping {
                min_size: self.settings.merge_threshold,
            }),
        }
    }

    /// Normalize `tracks` and cut them into playlists.
    ///
    /// # Errors
    ///
    /// Empty libraries and tracks missing a required attribute fail the
    /// whole run before anything is grouped.
    pub fn organize(
        &self,
        tracks: &[EnrichedTrack],
        strategy: &dyn PlaylistGroupingStrategy,
    ) -> Result<Vec<Playlist>, OrganizeError> {
        let batch = normalize(tracks, &self.settings.weights, self.reducer.as_ref())?;
        info!(
            "Organizing {} tracks with {} grouping ({} dimensions)",
            batch.len(),
            strategy.name(),
            batch.dimensions()
        );
        strategy.group(&batch)
    }
}
