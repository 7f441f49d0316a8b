//! k-means clustering implementation.
//!
//! Shared by the coarse quantizer (IVF cells), the product quantizer (one
//! codebook per segment), and OPQ training. Lloyd's algorithm with k-means++
//! seeding, squared Euclidean distance, and empty-cluster repair by splitting
//! the largest cluster.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::distance::l2_squared;
use crate::error::{AnnError, Result};

/// Relative perturbation used when splitting a cluster to refill an empty one.
const SPLIT_EPSILON: f32 = 1.0 / 1024.0;

/// Below this many points the assignment step stays on the calling thread.
const PARALLEL_ASSIGN_THRESHOLD: usize = 4096;

/// k-means clustering over flat row-major vectors.
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Centroids, row-major `k x dimension`.
    centroids: Vec<f32>,
    dimension: usize,
    k: usize,
    seed: u64,
    max_iterations: usize,
    tolerance: f32,
    purpose: &'static str,
}

/// Outcome of a [`KMeans::fit`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansReport {
    pub iterations: usize,
    pub converged: bool,
    /// Sum of squared distances to the assigned centroid after the last iteration.
    pub inertia: f64,
    /// Number of empty clusters repaired across all iterations.
    pub splits: usize,
}

impl KMeans {
    /// Create new k-means with `k` clusters.
    pub fn new(dimension: usize, k: usize) -> Result<Self> {
        if dimension == 0 || k == 0 {
            return Err(AnnError::InvalidConfig(
                "k-means dimension and k must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            centroids: Vec::new(),
            dimension,
            k,
            seed: 0,
            max_iterations: 25,
            tolerance: 1e-6,
            purpose: "k-means",
        })
    }

    /// Seed for k-means++ initialization. Fits on the same input with the
    /// same seed produce identical centroids.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Upper bound on Lloyd iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Stop once no centroid moves by more than this squared distance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Label used in errors and log events ("coarse quantizer", "pq segment", ...).
    #[must_use]
    pub fn with_purpose(mut self, purpose: &'static str) -> Self {
        self.purpose = purpose;
        self
    }

    /// Train on `num_vectors` rows of `vectors`.
    pub fn fit(&mut self, vectors: &[f32], num_vectors: usize) -> Result<KMeansReport> {
        if vectors.len() < num_vectors * self.dimension {
            return Err(AnnError::InvalidArgument(format!(
                "{}: buffer holds {} values, expected {num_vectors} x {}",
                self.purpose,
                vectors.len(),
                self.dimension
            )));
        }
        if num_vectors < self.k {
            return Err(AnnError::InsufficientData {
                what: self.purpose,
                needed: self.k,
                available: num_vectors,
            });
        }

        self.centroids = self.kmeans_plus_plus(vectors, num_vectors);

        let mut report = KMeansReport {
            iterations: 0,
            converged: false,
            inertia: 0.0,
            splits: 0,
        };

        for iteration in 0..self.max_iterations {
            let (assignments, inertia) = self.assign_with_inertia(vectors, num_vectors);
            let (mut new_centroids, counts) =
                self.update_centroids(vectors, num_vectors, &assignments);
            report.splits += self.split_empty_clusters(&mut new_centroids, &counts);

            let max_shift = self
                .centroids
                .chunks_exact(self.dimension)
                .zip(new_centroids.chunks_exact(self.dimension))
                .map(|(old, new)| l2_squared(old, new))
                .fold(0.0f32, f32::max);

            self.centroids = new_centroids;
            report.iterations = iteration + 1;
            report.inertia = inertia;

            debug!(
                purpose = self.purpose,
                iteration = iteration + 1,
                inertia,
                max_shift,
                "k-means iteration"
            );

            if max_shift <= self.tolerance {
                report.converged = true;
                break;
            }
        }

        if report.splits > 0 {
            warn!(
                purpose = self.purpose,
                splits = report.splits,
                k = self.k,
                "repaired empty k-means clusters by splitting"
            );
        }

        Ok(report)
    }

    /// k-means++ initialization.
    fn kmeans_plus_plus(&self, vectors: &[f32], num_vectors: usize) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = Vec::with_capacity(self.k * self.dimension);

        let first_idx = rng.random_range(0..num_vectors);
        centroids.extend_from_slice(self.get_vector(vectors, first_idx));

        // Squared distance of every point to its nearest chosen centroid,
        // updated incrementally with each new pick.
        let mut min_dists: Vec<f32> = (0..num_vectors)
            .map(|i| l2_squared(self.get_vector(vectors, i), &centroids[..self.dimension]))
            .collect();

        for c in 1..self.k {
            let total: f64 = min_dists.iter().map(|&d| d as f64).sum();

            let chosen = if total <= 0.0 {
                // Every point coincides with a centroid already; any pick works.
                rng.random_range(0..num_vectors)
            } else {
                let threshold = rng.random::<f64>() * total;
                let mut cumulative = 0.0f64;
                let mut chosen = num_vectors - 1;
                for (i, &d) in min_dists.iter().enumerate() {
                    cumulative += d as f64;
                    if cumulative >= threshold {
                        chosen = i;
                        break;
                    }
                }
                chosen
            };

            centroids.extend_from_slice(self.get_vector(vectors, chosen));
            let newest = &centroids[c * self.dimension..(c + 1) * self.dimension];
            for (i, d) in min_dists.iter_mut().enumerate() {
                let nd = l2_squared(self.get_vector(vectors, i), newest);
                if nd < *d {
                    *d = nd;
                }
            }
        }

        centroids
    }

    /// Nearest centroid of `vector` and its squared distance. Ties resolve to
    /// the lowest centroid index.
    #[inline]
    pub fn nearest(&self, vector: &[f32]) -> (usize, f32) {
        nearest_row(&self.centroids, self.dimension, vector)
    }

    /// Assign vectors to nearest clusters.
    pub fn assign_clusters(&self, vectors: &[f32], num_vectors: usize) -> Vec<usize> {
        self.assign_with_inertia(vectors, num_vectors).0
    }

    fn assign_with_inertia(&self, vectors: &[f32], num_vectors: usize) -> (Vec<usize>, f64) {
        let rows = &vectors[..num_vectors * self.dimension];
        let nearest: Vec<(usize, f32)> = if num_vectors >= PARALLEL_ASSIGN_THRESHOLD {
            rows.par_chunks_exact(self.dimension)
                .map(|v| self.nearest(v))
                .collect()
        } else {
            rows.chunks_exact(self.dimension)
                .map(|v| self.nearest(v))
                .collect()
        };

        let inertia = nearest.iter().map(|&(_, d)| d as f64).sum();
        (nearest.into_iter().map(|(c, _)| c).collect(), inertia)
    }

    /// Recompute centroids as cluster means. Empty clusters keep their old
    /// position until [`Self::split_empty_clusters`] moves them.
    fn update_centroids(
        &self,
        vectors: &[f32],
        num_vectors: usize,
        assignments: &[usize],
    ) -> (Vec<f32>, Vec<usize>) {
        let mut sums = vec![0.0f32; self.k * self.dimension];
        let mut counts = vec![0usize; self.k];

        for (i, &cluster) in assignments.iter().enumerate().take(num_vectors) {
            counts[cluster] += 1;
            let row = &mut sums[cluster * self.dimension..(cluster + 1) * self.dimension];
            for (s, &x) in row.iter_mut().zip(self.get_vector(vectors, i)) {
                *s += x;
            }
        }

        for (c, &count) in counts.iter().enumerate() {
            let row = &mut sums[c * self.dimension..(c + 1) * self.dimension];
            if count > 0 {
                let inv = 1.0 / count as f32;
                for s in row.iter_mut() {
                    *s *= inv;
                }
            } else {
                row.copy_from_slice(&self.centroids[c * self.dimension..(c + 1) * self.dimension]);
            }
        }

        (sums, counts)
    }

    /// Refill each empty cluster by splitting the currently largest one.
    ///
    /// The two halves get opposite multiplicative perturbations so the next
    /// assignment step separates them. Returns the number of splits.
    fn split_empty_clusters(&self, centroids: &mut [f32], counts: &[usize]) -> usize {
        let mut counts = counts.to_vec();
        let mut splits = 0;

        for empty in 0..self.k {
            if counts[empty] != 0 {
                continue;
            }
            let Some((largest, &size)) = counts
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            else {
                break;
            };
            if size < 2 {
                break;
            }

            let d = self.dimension;
            let source = centroids[largest * d..(largest + 1) * d].to_vec();
            for j in 0..d {
                let (up, down) = if j % 2 == 0 {
                    (1.0 + SPLIT_EPSILON, 1.0 - SPLIT_EPSILON)
                } else {
                    (1.0 - SPLIT_EPSILON, 1.0 + SPLIT_EPSILON)
                };
                centroids[empty * d + j] = source[j] * up;
                centroids[largest * d + j] = source[j] * down;
            }

            counts[empty] = size / 2;
            counts[largest] = size - size / 2;
            splits += 1;
        }

        splits
    }

    /// Get vector from flat storage.
    #[inline]
    fn get_vector<'a>(&self, vectors: &'a [f32], idx: usize) -> &'a [f32] {
        let start = idx * self.dimension;
        &vectors[start..start + self.dimension]
    }

    /// Centroids, row-major `k x dimension`.
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    /// Take ownership of the trained centroids.
    pub fn into_centroids(self) -> Vec<f32> {
        self.centroids
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Nearest row of a row-major matrix by squared L2; ties go to the lowest row.
#[inline]
pub(crate) fn nearest_row(rows: &[f32], dimension: usize, vector: &[f32]) -> (usize, f32) {
    let mut best = 0usize;
    let mut best_dist = f32::INFINITY;
    for (idx, row) in rows.chunks_exact(dimension).enumerate() {
        let dist = l2_squared(vector, row);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    (best, best_dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_blobs() -> Vec<f32> {
        let mut v = Vec::new();
        for i in 0..20 {
            let jitter = i as f32 * 0.01;
            v.extend_from_slice(&[0.0 + jitter, 0.0 - jitter]);
        }
        for i in 0..20 {
            let jitter = i as f32 * 0.01;
            v.extend_from_slice(&[10.0 + jitter, 10.0 - jitter]);
        }
        v
    }

    #[test]
    fn separates_two_blobs() {
        let data = two_blobs();
        let mut km = KMeans::new(2, 2).unwrap().with_seed(3);
        let report = km.fit(&data, 40).unwrap();
        assert!(report.converged);

        let assignments = km.assign_clusters(&data, 40);
        assert!(assignments[..20].iter().all(|&a| a == assignments[0]));
        assert!(assignments[20..].iter().all(|&a| a == assignments[20]));
        assert_ne!(assignments[0], assignments[20]);
    }

    #[test]
    fn too_few_points_is_insufficient_data() {
        let mut km = KMeans::new(2, 8).unwrap().with_purpose("coarse quantizer");
        let err = km.fit(&[0.0; 8], 4).unwrap_err();
        assert_eq!(
            err,
            AnnError::InsufficientData {
                what: "coarse quantizer",
                needed: 8,
                available: 4
            }
        );
    }

    #[test]
    fn nearest_breaks_ties_by_lowest_index() {
        let rows = [1.0, 0.0, -1.0, 0.0];
        assert_eq!(nearest_row(&rows, 2, &[0.0, 0.0]).0, 0);
    }

    #[test]
    fn duplicate_points_leave_no_nan_centroids() {
        // Fewer distinct points than clusters: some clusters start empty.
        let mut data = Vec::new();
        for _ in 0..16 {
            data.extend_from_slice(&[1.0, 2.0]);
        }
        data.extend_from_slice(&[5.0, 5.0]);
        let mut km = KMeans::new(2, 4).unwrap().with_seed(1);
        km.fit(&data, 17).unwrap();
        assert!(km.centroids().iter().all(|c| c.is_finite()));
    }

    proptest! {
        #[test]
        fn prop_kmeans_fit_is_deterministic_given_seed(
            seed in any::<u64>(),
            dimension in 1usize..16,
            num_vectors in 2usize..64,
            k in 1usize..16,
            raw in proptest::collection::vec(-1.0f32..1.0f32, 2usize..(64*16)),
        ) {
            prop_assume!(k <= num_vectors);
            let needed = num_vectors * dimension;
            prop_assume!(raw.len() >= needed);
            let vectors = raw[..needed].to_vec();

            let mut km1 = KMeans::new(dimension, k).unwrap().with_seed(seed);
            let mut km2 = KMeans::new(dimension, k).unwrap().with_seed(seed);

            km1.fit(&vectors, num_vectors).unwrap();
            km2.fit(&vectors, num_vectors).unwrap();

            prop_assert_eq!(km1.centroids(), km2.centroids());
            let a1 = km1.assign_clusters(&vectors, num_vectors);
            let a2 = km2.assign_clusters(&vectors, num_vectors);
            prop_assert_eq!(a1, a2);
        }
    }
}
