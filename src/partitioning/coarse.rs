//! The IVF coarse quantizer: `n_list` frozen k-means centroids.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::info;

use super::kmeans::{nearest_row, KMeans};
use crate::distance::l2_squared;
use crate::error::{AnnError, Result};
use crate::store::VectorStore;

/// Probed cells with their squared distance to the query, nearest first.
pub type ProbeList = SmallVec<[(usize, f32); 16]>;

/// Training knobs shared by every k-means run of an index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    /// Lloyd iterations per k-means run.
    pub max_iterations: usize,
    /// Training sample cap, as a multiple of the number of clusters.
    pub max_points_per_centroid: usize,
    /// Seed for sampling and k-means++ initialization.
    pub seed: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            max_points_per_centroid: 256,
            seed: 1234,
        }
    }
}

/// Voronoi partition of the vector space into `n_list` cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarseQuantizer {
    /// Row-major `n_list x dimension`.
    centroids: Vec<f32>,
    dimension: usize,
    n_list: usize,
}

impl CoarseQuantizer {
    /// Run k-means over (a sample of) `store` to obtain `n_list` centroids.
    pub fn train(store: &VectorStore, n_list: usize, params: &TrainParams) -> Result<Self> {
        if n_list == 0 {
            return Err(AnnError::InvalidConfig("n_list must be > 0".into()));
        }
        if store.len() < n_list {
            return Err(AnnError::InsufficientData {
                what: "coarse quantizer",
                needed: n_list,
                available: store.len(),
            });
        }

        let cap = params.max_points_per_centroid.saturating_mul(n_list);
        let sample = store.sample(cap, params.seed);
        let n_sample = sample.len() / store.dimension();

        let mut kmeans = KMeans::new(store.dimension(), n_list)?
            .with_seed(params.seed)
            .with_max_iterations(params.max_iterations)
            .with_purpose("coarse quantizer");
        let report = kmeans.fit(&sample, n_sample)?;

        info!(
            n_list,
            n_train = n_sample,
            iterations = report.iterations,
            converged = report.converged,
            inertia = report.inertia,
            "trained coarse quantizer"
        );

        Ok(Self {
            centroids: kmeans.into_centroids(),
            dimension: store.dimension(),
            n_list,
        })
    }

    /// Build from explicit centroids (row-major).
    pub fn from_centroids(centroids: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 || centroids.is_empty() || centroids.len() % dimension != 0 {
            return Err(AnnError::InvalidConfig(format!(
                "{} centroid values do not form rows of dimension {dimension}",
                centroids.len()
            )));
        }
        let n_list = centroids.len() / dimension;
        Ok(Self {
            centroids,
            dimension,
            n_list,
        })
    }

    /// Index of the nearest centroid; ties go to the lowest index.
    #[inline]
    pub fn assign(&self, vector: &[f32]) -> usize {
        nearest_row(&self.centroids, self.dimension, vector).0
    }

    /// The `n_probe` nearest cells to `query`, ascending by distance then index.
    ///
    /// `n_probe` larger than `n_list` probes every cell.
    pub fn probe(&self, query: &[f32], n_probe: usize) -> ProbeList {
        let mut dists: Vec<(usize, f32)> = self
            .centroids
            .chunks_exact(self.dimension)
            .map(|c| l2_squared(query, c))
            .enumerate()
            .collect();

        let n_probe = n_probe.min(self.n_list);
        let by_distance = |a: &(usize, f32), b: &(usize, f32)| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0));
        if n_probe > 0 && n_probe < dists.len() {
            dists.select_nth_unstable_by(n_probe - 1, by_distance);
        }
        dists.truncate(n_probe);
        dists.sort_unstable_by(by_distance);
        dists.into_iter().collect()
    }

    /// Centroid `cell`.
    pub fn centroid(&self, cell: usize) -> Result<&[f32]> {
        if cell >= self.n_list {
            return Err(AnnError::OutOfRange {
                index: cell,
                len: self.n_list,
            });
        }
        let start = cell * self.dimension;
        Ok(&self.centroids[start..start + self.dimension])
    }

    /// Centroid `cell` for a cell index produced by [`Self::assign`] or
    /// [`Self::probe`].
    #[inline]
    pub(crate) fn centroid_unchecked(&self, cell: usize) -> &[f32] {
        let start = cell * self.dimension;
        &self.centroids[start..start + self.dimension]
    }

    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    pub fn n_list(&self) -> usize {
        self.n_list
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn size_bytes(&self) -> usize {
        self.centroids.len() * std::mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CoarseQuantizer {
        // Four cells on a line: x = 0, 1, 2, 3.
        CoarseQuantizer::from_centroids(vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 2).unwrap()
    }

    #[test]
    fn probe_returns_nearest_cells_in_order() {
        let cq = grid();
        let probed = cq.probe(&[2.2, 0.0], 3);
        let cells: Vec<usize> = probed.iter().map(|&(c, _)| c).collect();
        assert_eq!(cells, vec![2, 3, 1]);
        assert!(probed.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn probe_clamps_to_n_list() {
        let cq = grid();
        assert_eq!(cq.probe(&[0.0, 0.0], 100).len(), 4);
    }

    #[test]
    fn probe_ties_prefer_lower_index() {
        let cq = grid();
        let probed = cq.probe(&[1.5, 0.0], 1);
        assert_eq!(probed[0].0, 1);
    }

    #[test]
    fn centroid_out_of_range() {
        let cq = grid();
        assert_eq!(
            cq.centroid(4).unwrap_err(),
            AnnError::OutOfRange { index: 4, len: 4 }
        );
    }

    #[test]
    fn train_rejects_fewer_vectors_than_cells() {
        let store = VectorStore::from_rows(&[vec![0.0f32, 1.0], vec![1.0, 0.0]]).unwrap();
        let err = CoarseQuantizer::train(&store, 3, &TrainParams::default()).unwrap_err();
        assert!(matches!(
            err,
            AnnError::InsufficientData {
                needed: 3,
                available: 2,
                ..
            }
        ));
    }
}
