//! Probe / score / top-k over inverted lists, shared by every IVF variant.

use rayon::prelude::*;
use tracing::debug;

use super::lists::InvertedLists;
use super::ListCodec;
use crate::distance::residual_into;
use crate::error::{AnnError, Result};
use crate::partitioning::{CoarseQuantizer, TrainParams};
use crate::store::{sample_rows, VectorStore};
use crate::topk::{SearchStats, TopK};

/// An IVF index whose lists store `C`-encoded vectors.
///
/// Only obtainable from a finished build, so every instance is searchable.
#[derive(Debug, Clone)]
pub struct IVFIndex<C: ListCodec> {
    coarse: CoarseQuantizer,
    codec: C,
    lists: InvertedLists<C::Code>,
}

impl<C: ListCodec> IVFIndex<C> {
    /// Train the coarse quantizer on `store`, train the codec with
    /// `train_codec` (given the store and the coarse quantizer), then fill
    /// the lists.
    pub fn build_with<F>(
        store: &VectorStore,
        n_list: usize,
        train: &TrainParams,
        train_codec: F,
    ) -> Result<Self>
    where
        F: FnOnce(&VectorStore, &CoarseQuantizer) -> Result<C>,
    {
        let coarse = CoarseQuantizer::train(store, n_list, train)?;
        let codec = train_codec(store, &coarse)?;
        Self::from_parts(store, coarse, codec)
    }

    /// Fill lists for an already trained coarse quantizer and codec.
    pub fn from_parts(store: &VectorStore, coarse: CoarseQuantizer, codec: C) -> Result<Self> {
        let lists = InvertedLists::build(store, &coarse, &codec)?;
        Ok(Self {
            coarse,
            codec,
            lists,
        })
    }

    /// The `k` nearest stored vectors to `query` among the `n_probe`
    /// nearest cells, ascending by approximate squared distance.
    pub fn search(&self, query: &[f32], k: usize, n_probe: usize) -> Result<Vec<(u32, f32)>> {
        self.search_with_stats(query, k, n_probe).map(|(hits, _)| hits)
    }

    /// [`Self::search`] plus the work it took.
    pub fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        if k == 0 {
            return Err(AnnError::InvalidArgument("k must be > 0".into()));
        }
        if n_probe == 0 {
            return Err(AnnError::InvalidArgument("n_probe must be > 0".into()));
        }
        if query.len() != self.dimension() {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let probed = self.coarse.probe(query, n_probe);
        let mut stats = SearchStats {
            coarse_distance_computations: self.coarse.n_list(),
            ..SearchStats::default()
        };

        let by_residual = self.codec.by_residual();
        let mut table = self.codec.new_table();
        let mut residual = vec![0.0f32; self.dimension()];
        if !by_residual {
            self.codec.prepare_into(query, &mut table);
        }

        let mut top = TopK::new(k);
        for &(cell, _) in &probed {
            let list = self.lists.list_for(cell)?;
            if list.is_empty() {
                continue;
            }
            if by_residual {
                residual_into(query, self.coarse.centroid_unchecked(cell), &mut residual);
                self.codec.prepare_into(&residual, &mut table);
            }
            for (id, code) in list.iter() {
                top.push(id, self.codec.score(&table, code));
            }
            stats.lists_probed += 1;
            stats.distance_computations += list.len();
        }

        debug!(
            n_probe = probed.len(),
            lists_probed = stats.lists_probed,
            candidates = stats.distance_computations,
            "ivf search"
        );

        Ok((top.into_sorted_vec(), stats))
    }

    pub fn coarse(&self) -> &CoarseQuantizer {
        &self.coarse
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn lists(&self) -> &InvertedLists<C::Code> {
        &self.lists
    }

    pub fn n_list(&self) -> usize {
        self.coarse.n_list()
    }

    pub fn dimension(&self) -> usize {
        self.coarse.dimension()
    }

    pub fn num_vectors(&self) -> usize {
        self.lists.total_len()
    }

    /// Centroids plus list storage (codec state is small and excluded).
    pub fn size_bytes(&self) -> usize {
        self.coarse.size_bytes() + self.lists.size_bytes()
    }
}

/// Residuals `x - centroid(assign(x))` of a seeded sample of at most `max`
/// vectors of `store`, flattened. Used to train residual codecs.
pub(crate) fn sample_residuals(
    store: &VectorStore,
    coarse: &CoarseQuantizer,
    max: usize,
    seed: u64,
) -> Vec<f32> {
    let dim = store.dimension();
    let mut rows = sample_rows(store.as_flat(), dim, store.len(), max, seed);
    rows.par_chunks_exact_mut(dim).for_each_init(
        || vec![0.0f32; dim],
        |scratch, row| {
            scratch.copy_from_slice(row);
            let cell = coarse.assign(scratch);
            residual_into(scratch, coarse.centroid_unchecked(cell), row);
        },
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ivf::flat::FlatCodec;

    fn two_blobs() -> VectorStore {
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(vec![i as f32 * 0.01, 0.0]);
            rows.push(vec![10.0 + i as f32 * 0.01, 0.0]);
        }
        VectorStore::from_rows(&rows).unwrap()
    }

    fn index() -> IVFIndex<FlatCodec> {
        let store = two_blobs();
        let coarse = CoarseQuantizer::from_centroids(vec![0.0, 0.0, 10.0, 0.0], 2).unwrap();
        IVFIndex::from_parts(&store, coarse, FlatCodec::new(2)).unwrap()
    }

    #[test]
    fn single_probe_stays_in_nearest_cell() {
        let idx = index();
        let (hits, stats) = idx.search_with_stats(&[10.0, 0.0], 5, 1).unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|&(id, _)| id % 2 == 1));
        assert_eq!(hits[0].0, 1);
        assert_eq!(stats.lists_probed, 1);
        assert_eq!(stats.distance_computations, 10);
        assert_eq!(stats.coarse_distance_computations, 2);
    }

    #[test]
    fn fewer_candidates_than_k_gives_short_result() {
        let idx = index();
        let hits = idx.search(&[0.0, 0.0], 50, 1).unwrap();
        assert_eq!(hits.len(), 10);
    }

    #[test]
    fn n_probe_above_n_list_probes_everything() {
        let idx = index();
        let hits = idx.search(&[0.0, 0.0], 50, 99).unwrap();
        assert_eq!(hits.len(), 20);
    }

    #[test]
    fn rejects_bad_arguments() {
        let idx = index();
        assert!(matches!(
            idx.search(&[0.0, 0.0], 0, 1),
            Err(AnnError::InvalidArgument(_))
        ));
        assert!(matches!(
            idx.search(&[0.0, 0.0], 1, 0),
            Err(AnnError::InvalidArgument(_))
        ));
        assert_eq!(
            idx.search(&[0.0; 3], 1, 1).unwrap_err(),
            AnnError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }
}
