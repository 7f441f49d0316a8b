//! LSH index: binary codes from random projections, exhaustive Hamming scan.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::random_projection::{hamming, RandomProjection};
use crate::error::{AnnError, Result};
use crate::store::VectorStore;
use crate::topk::{SearchStats, TopK};

/// LSH parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LSHParams {
    /// Code length in bits.
    pub n_bits: usize,
    /// Use per-bit median thresholds instead of zero.
    pub train_thresholds: bool,
    pub seed: u64,
}

impl Default for LSHParams {
    fn default() -> Self {
        Self {
            n_bits: 64,
            train_thresholds: false,
            seed: 1234,
        }
    }
}

/// Every vector stored as an `n_bits` binary code.
///
/// Distances reported by search are Hamming distances (as `f32`).
#[derive(Debug, Clone)]
pub struct LSHIndex {
    projection: RandomProjection,
    codes: Vec<u64>,
    len: usize,
}

impl LSHIndex {
    pub fn build(store: &VectorStore, params: &LSHParams) -> Result<Self> {
        if params.n_bits == 0 {
            return Err(AnnError::InvalidConfig("n_bits must be > 0".into()));
        }
        if store.dimension() == 0 {
            return Err(AnnError::InvalidConfig("dimension must be > 0".into()));
        }
        if store.len() > u32::MAX as usize {
            return Err(AnnError::InvalidArgument(format!(
                "{} vectors exceed the u32 id space",
                store.len()
            )));
        }

        let mut projection = RandomProjection::new(store.dimension(), params.n_bits, params.seed);
        if params.train_thresholds {
            projection.train_thresholds(store.as_flat(), store.len());
        }

        let words = projection.words();
        let mut codes = vec![0u64; store.len() * words];
        codes
            .par_chunks_exact_mut(words)
            .zip(store.as_flat().par_chunks_exact(store.dimension()))
            .for_each_init(
                || vec![0.0f32; params.n_bits],
                |scratch, (code, v)| projection.hash_into(v, scratch, code),
            );

        info!(
            n = store.len(),
            n_bits = params.n_bits,
            train_thresholds = params.train_thresholds,
            "built lsh index"
        );

        Ok(Self {
            projection,
            codes,
            len: store.len(),
        })
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>> {
        self.search_with_stats(query, k).map(|(hits, _)| hits)
    }

    pub fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        if k == 0 {
            return Err(AnnError::InvalidArgument("k must be > 0".into()));
        }
        if query.len() != self.projection.dimension() {
            return Err(AnnError::DimensionMismatch {
                expected: self.projection.dimension(),
                actual: query.len(),
            });
        }

        let mut scratch = vec![0.0f32; self.projection.n_bits()];
        let mut code = vec![0u64; self.projection.words()];
        self.projection.hash_into(query, &mut scratch, &mut code);

        let mut top = TopK::new(k);
        for (id, stored) in self.codes.chunks_exact(code.len()).enumerate() {
            top.push(id as u32, hamming(&code, stored) as f32);
        }
        let stats = SearchStats {
            distance_computations: self.len,
            ..SearchStats::default()
        };
        Ok((top.into_sorted_vec(), stats))
    }

    pub fn projection(&self) -> &RandomProjection {
        &self.projection
    }

    pub fn n_bits(&self) -> usize {
        self.projection.n_bits()
    }

    pub fn dimension(&self) -> usize {
        self.projection.dimension()
    }

    pub fn num_vectors(&self) -> usize {
        self.len
    }

    pub fn size_bytes(&self) -> usize {
        self.codes.len() * std::mem::size_of::<u64>() + self.projection.size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn store(n: usize, d: usize) -> VectorStore {
        let mut rng = StdRng::seed_from_u64(8);
        let data = (0..n * d).map(|_| rng.random_range(-1.0..1.0)).collect();
        VectorStore::from_flat(data, d).unwrap()
    }

    #[test]
    fn exact_duplicate_has_zero_distance() {
        let s = store(200, 16);
        let index = LSHIndex::build(&s, &LSHParams::default()).unwrap();
        for id in [3usize, 77, 199] {
            let (hits, stats) = index.search_with_stats(s.get(id), 5).unwrap();
            assert_eq!(hits[0].1, 0.0);
            assert!(hits.iter().any(|&(h, d)| h as usize == id && d == 0.0));
            assert_eq!(stats.distance_computations, 200);
        }
    }

    #[test]
    fn trained_thresholds_still_find_duplicates() {
        let s = store(200, 8);
        let params = LSHParams {
            n_bits: 32,
            train_thresholds: true,
            ..Default::default()
        };
        let index = LSHIndex::build(&s, &params).unwrap();
        let hits = index.search(s.get(10), 3).unwrap();
        assert!(hits.iter().any(|&(h, d)| h == 10 && d == 0.0));
    }

    #[test]
    fn rejects_zero_bits() {
        let s = store(10, 4);
        let params = LSHParams {
            n_bits: 0,
            ..Default::default()
        };
        assert!(matches!(
            LSHIndex::build(&s, &params),
            Err(AnnError::InvalidConfig(_))
        ));
    }
}
