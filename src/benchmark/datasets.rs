//! Synthetic datasets and exact ground truth.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::distance::{l2_squared, Metric};
use crate::linalg::gaussian;
use crate::topk::TopK;

/// A dataset for ANN benchmarking.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Database vectors (what gets indexed).
    pub train: Vec<Vec<f32>>,
    /// Query vectors.
    pub test: Vec<Vec<f32>>,
    pub dimension: usize,
}

impl Dataset {
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    pub fn n_test(&self) -> usize {
        self.test.len()
    }

    /// Raw `f32` footprint of both splits.
    pub fn memory_bytes(&self) -> usize {
        (self.train.len() + self.test.len()) * self.dimension * std::mem::size_of::<f32>()
    }

    /// L2-normalize both splits in place (angular datasets).
    pub fn normalize(&mut self) {
        for v in self.train.iter_mut().chain(self.test.iter_mut()) {
            Metric::Angular.prepare(v);
        }
    }

    /// Exact `k` nearest training ids for every query.
    pub fn ground_truth(&self, k: usize) -> Vec<Vec<u32>> {
        ground_truth(&self.train, &self.test, k)
    }
}

/// Vectors uniform in `[0, 1]^d`.
///
/// A baseline with no structure; IVF partitions of uniform data are balanced
/// but gain little from probing fewer cells.
pub fn uniform_dataset(n_train: usize, n_test: usize, dimension: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draw = |n: usize| -> Vec<Vec<f32>> {
        (0..n)
            .map(|_| (0..dimension).map(|_| rng.random::<f32>()).collect())
            .collect()
    };
    let train = draw(n_train);
    let test = draw(n_test);
    Dataset {
        train,
        test,
        dimension,
    }
}

/// Isotropic Gaussian clusters.
///
/// `n_clusters` centers are drawn uniformly from `[-1, 1]^d`; each point picks
/// a center uniformly and adds `N(0, cluster_std^2)` noise per dimension.
/// Queries come from the same mixture.
pub fn gaussian_clusters(
    n_train: usize,
    n_test: usize,
    dimension: usize,
    n_clusters: usize,
    cluster_std: f32,
    seed: u64,
) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_clusters = n_clusters.max(1);

    let centers: Vec<Vec<f32>> = (0..n_clusters)
        .map(|_| (0..dimension).map(|_| rng.random_range(-1.0f32..1.0)).collect())
        .collect();

    let mut draw = |n: usize| -> Vec<Vec<f32>> {
        (0..n)
            .map(|_| {
                let center = &centers[rng.random_range(0..n_clusters)];
                center
                    .iter()
                    .map(|&c| c + cluster_std * gaussian(&mut rng))
                    .collect()
            })
            .collect()
    };
    let train = draw(n_train);
    let test = draw(n_test);
    Dataset {
        train,
        test,
        dimension,
    }
}

/// Exact `k` nearest neighbors of `query` in `database` by squared L2,
/// ties broken by id.
pub fn exact_knn(query: &[f32], database: &[Vec<f32>], k: usize) -> Vec<u32> {
    let mut top = TopK::new(k);
    for (i, v) in database.iter().enumerate() {
        top.push(i as u32, l2_squared(query, v));
    }
    top.into_sorted_vec().into_iter().map(|(id, _)| id).collect()
}

/// Brute-force ground truth for every query, in parallel.
pub fn ground_truth(database: &[Vec<f32>], queries: &[Vec<f32>], k: usize) -> Vec<Vec<u32>> {
    queries
        .par_iter()
        .map(|q| exact_knn(q, database, k))
        .collect()
}
