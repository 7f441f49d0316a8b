//! Indexes over scalar-quantized codes: flat (`SQ`) and inverted (`IVFSQ`).

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::sq::{QuantizerType, ScalarQuantizer};
use crate::error::{AnnError, Result};
use crate::ivf::index::sample_residuals;
use crate::ivf::IVFIndex;
use crate::partitioning::TrainParams;
use crate::store::VectorStore;
use crate::topk::{SearchStats, TopK};

/// Flat SQ parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SQParams {
    #[serde(alias = "qname")]
    pub qtype: QuantizerType,
}

/// Every vector stored as an SQ code; search scans all of them.
#[derive(Debug, Clone)]
pub struct SQIndex {
    sq: ScalarQuantizer,
    codes: Vec<u8>,
    len: usize,
}

impl SQIndex {
    pub fn build(store: &VectorStore, params: &SQParams) -> Result<Self> {
        let sq = ScalarQuantizer::train(
            store.as_flat(),
            store.len(),
            store.dimension(),
            params.qtype,
        )?;
        if store.len() > u32::MAX as usize {
            return Err(AnnError::InvalidArgument(format!(
                "{} vectors exceed the u32 id space",
                store.len()
            )));
        }

        let code_len = sq.code_len();
        let mut codes = vec![0u8; store.len() * code_len];
        codes
            .par_chunks_exact_mut(code_len)
            .zip(store.as_flat().par_chunks_exact(store.dimension()))
            .for_each(|(code, v)| sq.encode_into(v, code));

        info!(
            n = store.len(),
            qtype = %params.qtype,
            bytes = codes.len(),
            "built sq index"
        );

        Ok(Self {
            sq,
            codes,
            len: store.len(),
        })
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>> {
        self.search_with_stats(query, k).map(|(hits, _)| hits)
    }

    /// Exhaustive asymmetric scan.
    pub fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        if k == 0 {
            return Err(AnnError::InvalidArgument("k must be > 0".into()));
        }
        if query.len() != self.sq.dimension() {
            return Err(AnnError::DimensionMismatch {
                expected: self.sq.dimension(),
                actual: query.len(),
            });
        }

        let mut top = TopK::new(k);
        for (id, code) in self.codes.chunks_exact(self.sq.code_len()).enumerate() {
            top.push(id as u32, self.sq.distance(query, code));
        }
        let stats = SearchStats {
            distance_computations: self.len,
            ..SearchStats::default()
        };
        Ok((top.into_sorted_vec(), stats))
    }

    pub fn quantizer(&self) -> &ScalarQuantizer {
        &self.sq
    }

    pub fn dimension(&self) -> usize {
        self.sq.dimension()
    }

    pub fn num_vectors(&self) -> usize {
        self.len
    }

    pub fn size_bytes(&self) -> usize {
        self.codes.len() + self.sq.size_bytes()
    }
}

/// IVF-SQ parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IVFSQParams {
    #[serde(alias = "n_centroids")]
    pub n_list: usize,
    #[serde(alias = "qname")]
    pub qtype: QuantizerType,
    pub train: TrainParams,
}

impl Default for IVFSQParams {
    fn default() -> Self {
        Self {
            n_list: 64,
            qtype: QuantizerType::Bits8,
            train: TrainParams::default(),
        }
    }
}

/// Lists hold SQ codes of residuals to the cell centroid.
pub type IVFSQIndex = IVFIndex<ScalarQuantizer>;

impl IVFIndex<ScalarQuantizer> {
    /// Train the coarse quantizer, then the SQ ranges on residuals of the
    /// coarse training sample, then encode everything.
    pub fn build(store: &VectorStore, params: &IVFSQParams) -> Result<Self> {
        Self::build_with(store, params.n_list, &params.train, |store, coarse| {
            let cap = params
                .train
                .max_points_per_centroid
                .saturating_mul(params.n_list);
            let residuals = sample_residuals(store, coarse, cap, params.train.seed);
            let n = residuals.len() / store.dimension();
            ScalarQuantizer::train(&residuals, n, store.dimension(), params.qtype)
        })
    }
}
