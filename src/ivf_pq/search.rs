//! IVF-PQ index construction and search.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::opq::{OpqMatrix, DEFAULT_OPQ_ITERATIONS};
use super::pq::ProductQuantizer;
use crate::error::Result;
use crate::ivf::index::sample_residuals;
use crate::ivf::IVFIndex;
use crate::partitioning::{CoarseQuantizer, TrainParams};
use crate::store::VectorStore;
use crate::topk::SearchStats;

/// IVF-PQ parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IVFPQParams {
    /// Number of coarse cells (inverted lists).
    pub n_list: usize,

    /// Number of PQ segments; must divide the dimension.
    pub m: usize,

    /// Bits per segment code (`2^n_bits` codewords), 1..=8.
    pub n_bits: usize,

    /// Learn an OPQ rotation before partitioning and quantizing.
    pub use_opq: bool,

    /// Alternating OPQ iterations (ignored unless `use_opq`).
    pub opq_iterations: usize,

    pub train: TrainParams,
}

impl Default for IVFPQParams {
    fn default() -> Self {
        Self {
            n_list: 100,
            m: 8,
            n_bits: 8,
            use_opq: false,
            opq_iterations: DEFAULT_OPQ_ITERATIONS,
            train: TrainParams::default(),
        }
    }
}

/// IVF-PQ index for memory-efficient approximate nearest neighbor search.
///
/// Lists hold `m`-byte PQ codes of `vector - centroid`; search scores them
/// with one distance table per probed cell.
#[derive(Debug, Clone)]
pub struct IVFPQIndex {
    ivf: IVFIndex<ProductQuantizer>,
    opq: Option<OpqMatrix>,
    params: IVFPQParams,
}

impl IVFPQIndex {
    /// Train every component on `store` and encode all of it.
    ///
    /// Configuration errors (`d % m != 0`, `n_bits` out of range) are
    /// reported before any training starts.
    pub fn build(store: &VectorStore, params: &IVFPQParams) -> Result<Self> {
        ProductQuantizer::validate(store.dimension(), params.m, params.n_bits)?;

        let opq = if params.use_opq {
            Some(OpqMatrix::train(
                store.as_flat(),
                store.len(),
                store.dimension(),
                params.m,
                params.n_bits,
                params.opq_iterations,
                &params.train,
            )?)
        } else {
            None
        };

        let rotated;
        let store = match &opq {
            Some(opq) => {
                rotated = opq.apply_store(store)?;
                &rotated
            }
            None => store,
        };

        let ivf = IVFIndex::build_with(store, params.n_list, &params.train, |store, coarse| {
            train_residual_pq(store, coarse, params)
        })?;

        info!(
            n = ivf.num_vectors(),
            n_list = params.n_list,
            m = params.m,
            n_bits = params.n_bits,
            opq = params.use_opq,
            bytes = ivf.size_bytes(),
            "built ivf-pq index"
        );

        Ok(Self {
            ivf,
            opq,
            params: params.clone(),
        })
    }

    /// Search for the `k` nearest neighbors among the `n_probe` nearest cells.
    pub fn search(&self, query: &[f32], k: usize, n_probe: usize) -> Result<Vec<(u32, f32)>> {
        self.search_with_stats(query, k, n_probe).map(|(hits, _)| hits)
    }

    pub fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        match &self.opq {
            Some(opq) if query.len() == opq.dimension() => {
                self.ivf.search_with_stats(&opq.apply(query), k, n_probe)
            }
            // Dimension errors are reported by the inner search.
            _ => self.ivf.search_with_stats(query, k, n_probe),
        }
    }

    pub fn ivf(&self) -> &IVFIndex<ProductQuantizer> {
        &self.ivf
    }

    pub fn pq(&self) -> &ProductQuantizer {
        self.ivf.codec()
    }

    pub fn opq(&self) -> Option<&OpqMatrix> {
        self.opq.as_ref()
    }

    pub fn params(&self) -> &IVFPQParams {
        &self.params
    }

    pub fn n_list(&self) -> usize {
        self.ivf.n_list()
    }

    pub fn dimension(&self) -> usize {
        self.ivf.dimension()
    }

    pub fn num_vectors(&self) -> usize {
        self.ivf.num_vectors()
    }

    pub fn size_bytes(&self) -> usize {
        self.ivf.size_bytes()
            + self.pq().size_bytes()
            + self.opq.as_ref().map_or(0, OpqMatrix::size_bytes)
    }
}

/// Train the PQ on residuals of a sample of `store` against `coarse`.
fn train_residual_pq(
    store: &VectorStore,
    coarse: &CoarseQuantizer,
    params: &IVFPQParams,
) -> Result<ProductQuantizer> {
    let dim = store.dimension();
    let ksub = 1usize << params.n_bits;
    let cap = params
        .train
        .max_points_per_centroid
        .saturating_mul(ksub)
        .max(ksub);
    let residuals = sample_residuals(store, coarse, cap, params.train.seed.wrapping_add(1));
    let n = residuals.len() / dim;

    ProductQuantizer::train(&residuals, n, dim, params.m, params.n_bits, &params.train)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnnError;
    use crate::ivf::ListCodec;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn clustered(n: usize, d: usize, seed: u64) -> VectorStore {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers: Vec<Vec<f32>> = (0..8)
            .map(|_| (0..d).map(|_| rng.random_range(-5.0..5.0)).collect())
            .collect();
        let mut data = Vec::with_capacity(n * d);
        for i in 0..n {
            let c = &centers[i % centers.len()];
            data.extend(c.iter().map(|x| x + rng.random_range(-0.5..0.5)));
        }
        VectorStore::from_flat(data, d).unwrap()
    }

    fn small_params() -> IVFPQParams {
        IVFPQParams {
            n_list: 8,
            m: 4,
            n_bits: 4,
            ..Default::default()
        }
    }

    #[test]
    fn indexes_every_vector() {
        let store = clustered(600, 16, 1);
        let index = IVFPQIndex::build(&store, &small_params()).unwrap();
        assert_eq!(index.num_vectors(), 600);
        assert_eq!(index.pq().code_len(), 4);
        assert_eq!(index.ivf().lists().list_sizes().iter().sum::<usize>(), 600);
    }

    #[test]
    fn finds_query_among_top_results() {
        let store = clustered(600, 16, 2);
        let index = IVFPQIndex::build(&store, &small_params()).unwrap();
        let mut found = 0;
        for id in (0..600).step_by(30) {
            let hits = index.search(store.get(id), 10, 8).unwrap();
            if hits.iter().any(|&(h, _)| h as usize == id) {
                found += 1;
            }
        }
        assert!(found >= 18, "found {found}/20");
    }

    #[test]
    fn results_sorted_and_unique() {
        let store = clustered(400, 8, 3);
        let index = IVFPQIndex::build(&store, &small_params()).unwrap();
        let hits = index.search(store.get(0), 25, 3).unwrap();
        assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
        let mut ids: Vec<u32> = hits.iter().map(|&(id, _)| id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), hits.len());
    }

    #[test]
    fn config_errors_come_before_training() {
        let store = clustered(20, 10, 4);
        let params = IVFPQParams {
            n_list: 4,
            m: 3,
            n_bits: 4,
            ..Default::default()
        };
        assert!(matches!(
            IVFPQIndex::build(&store, &params),
            Err(AnnError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rotated_variant_searches_in_rotated_space() {
        let store = clustered(600, 16, 5);
        let params = IVFPQParams {
            use_opq: true,
            opq_iterations: 2,
            ..small_params()
        };
        let index = IVFPQIndex::build(&store, &params).unwrap();
        assert!(index.opq().is_some());
        let hits = index.search(store.get(7), 10, 8).unwrap();
        assert!(hits.iter().any(|&(id, _)| id == 7));
        assert_eq!(
            index.search(&[0.0; 3], 5, 1).unwrap_err(),
            AnnError::DimensionMismatch {
                expected: 16,
                actual: 3
            }
        );
    }
}
