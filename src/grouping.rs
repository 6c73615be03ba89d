//! Playlist grouping strategies.
//!
//! Two ways of cutting a normalized library into playlists live behind
//! [`PlaylistGroupingStrategy`]:
//!
//! - [`ClusterGrouping`] runs k-means and emits one playlist per used cluster,
//!   named from its centroid (`Genrify_3_2016's Indie`).
//! - [`DecadeGenreGrouping`] skips clustering, buckets tracks by exact
//!   decade and dominant genre, then greedily folds undersized buckets into
//!   a neighbouring decade of the same genre (`Genrified_1990_2000s_Rock`).

use crate::cluster::{cluster_count, KMeans, DEFAULT_CLUSTER_SIZE, DEFAULT_MAX_ITERATIONS};
use crate::error::OrganizeError;
use crate::genre::Genre;
use crate::namer::name_centroid;
use crate::normalize::NormalizedBatch;
use chrono::Datelike;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::slice::Chunks;

/// Most track ids the playlist API accepts per add call.
pub const MAX_BATCH: usize = 50;

/// Name prefix of clustering playlists.
pub const CLUSTER_PREFIX: &str = "Genrify_";

/// Name prefix of decade/genre playlists.
pub const DECADE_PREFIX: &str = "Genrified_";

/// Default size under which a decade/genre group gets merged.
pub const DEFAULT_MERGE_THRESHOLD: usize = 10;

/// A generated playlist. Never mutated once a run has produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Grouping key: the cluster id, or `"{decade}s {genre}"`.
    pub key: String,
    pub name: String,
    pub track_ids: Vec<String>,
}

impl Playlist {
    /// Track ids in submission batches of at most `size` (clamped to `1..=MAX_BATCH`).
    #[must_use]
    pub fn batches(&self, size: usize) -> Chunks<'_, String> {
        self.track_ids.chunks(size.clamp(1, MAX_BATCH))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }
}

/// Splits a normalized batch into playlists.
pub trait PlaylistGroupingStrategy: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Produce the playlists for one run, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch cannot be grouped, e.g. a ragged matrix.
    fn group(&self, batch: &NormalizedBatch) -> Result<Vec<Playlist>, OrganizeError>;
}

/// One playlist per k-means cluster.
#[derive(Debug, Clone)]
pub struct ClusterGrouping {
    pub cluster_size: usize,
    pub max_iterations: usize,
    /// Fixed RNG seed; `None` draws fresh entropy every run.
    pub seed: Option<u64>,
}

impl Default for ClusterGrouping {
    fn default() -> Self {
        Self {
            cluster_size: DEFAULT_CLUSTER_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        }
    }
}

impl ClusterGrouping {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl PlaylistGroupingStrategy for ClusterGrouping {
    fn name(&self) -> &'static str {
        "cluster"
    }

    fn group(&self, batch: &NormalizedBatch) -> Result<Vec<Playlist>, OrganizeError> {
        let k = cluster_count(batch.len(), self.cluster_size);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let result = KMeans::fit(&batch.matrix(), k, self.max_iterations, &mut rng)?;

        let playlists: Vec<Playlist> = result
            .used_clusters()
            .into_iter()
            .map(|cluster| {
                let label = name_centroid(&result.centroids[cluster], &batch.dates, &batch.weights);
                Playlist {
                    key: cluster.to_string(),
                    name: format!("{CLUSTER_PREFIX}{}_{label}", cluster + 1),
                    track_ids: result
                        .members(cluster)
                        .into_iter()
                        .map(|row| batch.tracks[row].id.clone())
                        .collect(),
                }
            })
            .collect();

        info!("{} tracks clustered into {} playlists (k={k})", batch.len(), playlists.len());
        Ok(playlists)
    }
}

/// Decade/genre buckets with greedy merging of small ones.
#[derive(Debug, Clone)]
pub struct DecadeGenreGrouping {
    /// Groups with fewer tracks than this try to merge.
    pub min_size: usize,
}

impl Default for DecadeGenreGrouping {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

/// `"{first}s {genre}"` or, once merged, `"{first}_{last}s {genre}"`.
#[derive(Debug, Clone)]
struct DecadeGroup {
    first: i32,
    last: i32,
    genre: Genre,
    track_ids: Vec<String>,
    merged: bool,
    absorbed: bool,
}

impl DecadeGroup {
    fn key(&self) -> String {
        if self.first == self.last {
            format!("{}s {}", self.first, self.genre)
        } else {
            format!("{}_{}s {}", self.first, self.last, self.genre)
        }
    }

    fn available(&self) -> bool {
        !self.merged && !self.absorbed
    }
}

/// Playlist name for a decade/genre key: spaces and slashes become underscores.
#[must_use]
pub fn decade_playlist_name(key: &str) -> String {
    format!("{DECADE_PREFIX}{}", key.replace(' ', "_").replace('/', "_"))
}

/// Decade a year belongs to, e.g. 1987 -> 1980.
#[must_use]
pub const fn decade_of(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

impl DecadeGenreGrouping {
    /// Exact `(decade, genre)` buckets in ascending decade, then table order.
    /// Sentinel-genre tracks are left out.
    fn buckets(batch: &NormalizedBatch) -> Vec<DecadeGroup> {
        let mut buckets: BTreeMap<(i32, Genre), Vec<String>> = BTreeMap::new();
        for track in batch.tracks.iter().filter(|t| !t.genre.is_sentinel()) {
            buckets
                .entry((decade_of(track.released.year()), track.genre))
                .or_default()
                .push(track.id.clone());
        }
        buckets
            .into_iter()
            .map(|((decade, genre), track_ids)| DecadeGroup {
                first: decade,
                last: decade,
                genre,
                track_ids,
                merged: false,
                absorbed: false,
            })
            .collect()
    }

    fn neighbour(groups: &[DecadeGroup], decade: i32, genre: Genre) -> Option<usize> {
        groups
            .iter()
            .position(|g| g.available() && g.genre == genre && g.first == decade)
    }

    /// One left-to-right pass. A small group first takes the next decade's
    /// group of its genre, else joins the previous decade's; groups that have
    /// already merged are never touched again.
    fn merge_small(&self, mut groups: Vec<DecadeGroup>) -> Vec<DecadeGroup> {
        for i in 0..groups.len() {
            if !groups[i].available() || groups[i].track_ids.len() >= self.min_size {
                continue;
            }
            let (decade, genre) = (groups[i].first, groups[i].genre);

            if let Some(next) = Self::neighbour(&groups, decade + 10, genre) {
                let taken = std::mem::take(&mut groups[next].track_ids);
                groups[next].absorbed = true;
                let group = &mut groups[i];
                group.last = decade + 10;
                group.track_ids.extend(taken);
                group.merged = true;
                debug!("Merged small group forward into {}", group.key());
            } else if let Some(prev) = Self::neighbour(&groups, decade - 10, genre) {
                let taken = std::mem::take(&mut groups[i].track_ids);
                groups[i].absorbed = true;
                let group = &mut groups[prev];
                group.last = decade;
                group.track_ids.extend(taken);
                group.merged = true;
                debug!("Merged small group back into {}", group.key());
            } else {
                debug!("Keeping undersized group {} as is", groups[i].key());
            }
        }
        groups.retain(|g| !g.absorbed);
        groups
    }
}

impl PlaylistGroupingStrategy for DecadeGenreGrouping {
    fn name(&self) -> &'static str {
        "decade"
    }

    fn group(&self, batch: &NormalizedBatch) -> Result<Vec<Playlist>, OrganizeError> {
        let groups = self.merge_small(Self::buckets(batch));
        let playlists: Vec<Playlist> = groups
            .into_iter()
            .map(|group| {
                let key = group.key();
                Playlist {
                    name: decade_playlist_name(&key),
                    key,
                    track_ids: group.track_ids,
                }
            })
            .collect();
        info!("{} tracks grouped into {} decade playlists", batch.len(), playlists.len());
        Ok(playlists)
    }
}
