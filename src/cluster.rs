//! Bounded-iteration k-means over normalized feature vectors.
//!
//! Centroids start from a uniform `[0, 1)` draw per coordinate rather than
//! from sampled tracks. With weighted coordinates (the genre axis spans
//! 0..250) most of those starting points sit far from the data, so some
//! clusters can end up with no members at all. Empty clusters keep their
//! centroid and are simply never referenced by an assignment.

use crate::error::OrganizeError;
use log::debug;
use rand::Rng;

/// Iteration cap used when the caller has no opinion.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Average playlist size the cluster count aims for.
pub const DEFAULT_CLUSTER_SIZE: usize = 30;

/// Number of clusters for `tracks` tracks: `tracks / cluster_size + 1`.
///
/// A `cluster_size` of zero is treated as one.
#[must_use]
pub fn cluster_count(tracks: usize, cluster_size: usize) -> usize {
    tracks / cluster_size.max(1) + 1
}

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    /// `k` centroids, one per cluster id, including unused ones.
    pub centroids: Vec<Vec<f64>>,
    /// Cluster id per input row.
    pub assignments: Vec<usize>,
    pub iterations: usize,
    /// `false` when the iteration cap was hit first.
    pub converged: bool,
}

impl KMeans {
    /// Run Lloyd's algorithm on `data` with `k` uniformly initialized centroids.
    ///
    /// Hitting `max_iterations` is not an error; the assignment at the cap is
    /// returned. Rows must all have the same length.
    pub fn fit<R>(
        data: &[Vec<f64>],
        k: usize,
        max_iterations: usize,
        rng: &mut R,
    ) -> Result<Self, OrganizeError>
    where
        R: Rng + ?Sized,
    {
        let k = k.max(1);
        let dim = data.first().map_or(0, Vec::len);
        if let Some((row, found)) = data
            .iter()
            .enumerate()
            .find(|(_, point)| point.len() != dim)
            .map(|(row, point)| (row, point.len()))
        {
            return Err(OrganizeError::RaggedMatrix { row, expected: dim, found });
        }

        let mut centroids: Vec<Vec<f64>> = (0..k)
            .map(|_| (0..dim).map(|_| rng.gen::<f64>()).collect())
            .collect();
        // usize::MAX marks "not assigned yet" so the first pass always counts as a change.
        let mut assignments = vec![usize::MAX; data.len()];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iterations {
            iterations += 1;

            let next = assign(data, &centroids);
            if next == assignments {
                converged = true;
                break;
            }
            assignments = next;

            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0_usize; k];
            for (point, &cluster) in data.iter().zip(&assignments) {
                for (sum, value) in sums[cluster].iter_mut().zip(point) {
                    *sum += value;
                }
                counts[cluster] += 1;
            }
            for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
                if count > 0 {
                    for (c, s) in centroid.iter_mut().zip(sum) {
                        *c = s / count as f64;
                    }
                }
            }
        }

        if !converged {
            // Centroids moved after the last assignment; report against the final ones.
            assignments = assign(data, &centroids);
        }

        debug!(
            "k-means: {} points, k={k}, {iterations} iterations, converged={converged}",
            data.len()
        );

        Ok(Self {
            centroids,
            assignments,
            iterations,
            converged,
        })
    }

    /// Cluster ids that received at least one point, in order of first appearance.
    #[must_use]
    pub fn used_clusters(&self) -> Vec<usize> {
        let mut used = Vec::new();
        for &cluster in &self.assignments {
            if !used.contains(&cluster) {
                used.push(cluster);
            }
        }
        used
    }

    /// Row indices assigned to `cluster`, in input order.
    #[must_use]
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == cluster)
            .map(|(row, _)| row)
            .collect()
    }
}

/// Nearest centroid per point by Euclidean distance; ties go to the lower id.
fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    data.iter()
        .map(|point| {
            let mut best_cluster = 0;
            let mut min_dist_sq = f64::INFINITY;
            for (cluster, centroid) in centroids.iter().enumerate() {
                let dist_sq = distance_sq(point, centroid);
                if dist_sq < min_dist_sq {
                    min_dist_sq = dist_sq;
                    best_cluster = cluster;
                }
            }
            best_cluster
        })
        .collect()
}

fn distance_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_cluster_count() {
        assert_eq!(cluster_count(1, 30), 1);
        assert_eq!(cluster_count(29, 30), 1);
        assert_eq!(cluster_count(30, 30), 2);
        assert_eq!(cluster_count(31, 30), 2);
        assert_eq!(cluster_count(90, 30), 4);
        assert_eq!(cluster_count(91, 30), 4);
        assert_eq!(cluster_count(5, 0), 6);
    }

    #[test]
    fn test_every_point_assigned_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<Vec<f64>> = (0..100)
            .map(|i| vec![f64::from(i % 10), f64::from(i % 7) * 20.0, 0.5])
            .collect();
        let k = cluster_count(data.len(), DEFAULT_CLUSTER_SIZE);
        let result = KMeans::fit(&data, k, DEFAULT_MAX_ITERATIONS, &mut rng).unwrap();

        assert_eq!(result.assignments.len(), data.len());
        assert_eq!(result.centroids.len(), k);
        assert!(result.assignments.iter().all(|&c| c < k));
        let total: usize = result.used_clusters().iter().map(|&c| result.members(c).len()).sum();
        assert_eq!(total, data.len());
    }

    #[test]
    fn test_separates_obvious_groups() {
        let mut data = Vec::new();
        for i in 0..20 {
            data.push(vec![0.0 + f64::from(i) * 0.01, 0.0]);
            data.push(vec![0.9 + f64::from(i) * 0.001, 0.9]);
        }
        let mut rng = StdRng::seed_from_u64(42);
        let result = KMeans::fit(&data, 2, 100, &mut rng).unwrap();
        let used = result.used_clusters();
        if used.len() == 2 {
            let low = result.assignments[0];
            let high = result.assignments[1];
            assert_ne!(low, high);
            for (row, &cluster) in result.assignments.iter().enumerate() {
                assert_eq!(cluster, if row % 2 == 0 { low } else { high });
            }
        }
        assert!(result.converged);
    }

    #[test]
    fn test_unused_centroids_do_not_crash() {
        let mut rng = StdRng::seed_from_u64(1);
        // Far outside the unit cube: every point lands on whichever random centroid is closest.
        let data = vec![vec![500.0, 500.0], vec![501.0, 500.0]];
        let result = KMeans::fit(&data, 5, 50, &mut rng).unwrap();
        assert_eq!(result.centroids.len(), 5);
        assert!(!result.used_clusters().is_empty());
        assert!(result.used_clusters().len() <= 2);
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let data: Vec<Vec<f64>> = (0..50).map(|i| vec![f64::from(i), f64::from(50 - i)]).collect();
        let result = KMeans::fit(&data, 3, 1, &mut rng).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert_eq!(result.assignments.len(), 50);
    }

    #[test]
    fn test_single_point_and_empty_input() {
        let mut rng = StdRng::seed_from_u64(9);
        let single = KMeans::fit(&[vec![1.0, 2.0, 3.0]], 1, 10, &mut rng).unwrap();
        assert_eq!(single.assignments, vec![0]);
        assert_eq!(single.centroids[0], vec![1.0, 2.0, 3.0]);

        let empty = KMeans::fit(&[], 1, 10, &mut rng).unwrap();
        assert!(empty.assignments.is_empty());
        assert!(empty.used_clusters().is_empty());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let data = vec![vec![1.0, 2.0], vec![1.0]];
        let err = KMeans::fit(&data, 1, 10, &mut rng).unwrap_err();
        assert!(matches!(err, OrganizeError::RaggedMatrix { row: 1, expected: 2, found: 1 }));
    }

    #[test]
    fn test_same_seed_same_result() {
        let data: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![f64::from(i % 5), f64::from(i % 3)])
            .collect();
        let a = KMeans::fit(&data, 3, 100, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = KMeans::fit(&data, 3, 100, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }
}
