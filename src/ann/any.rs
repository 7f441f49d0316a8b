//! A built index of any supported kind, behind one dispatch point.

use tracing::info;

use super::config::IndexConfig;
use super::traits::ANNIndex;
#[cfg(feature = "lsh")]
use crate::classic::lsh::LSHIndex;
use crate::error::{AnnError, Result};
use crate::ivf::IVFFlatIndex;
use crate::ivf_pq::{IVFPQIndex, IVFPQParams};
#[cfg(feature = "sq")]
use crate::quantization::{IVFSQIndex, SQIndex};
use crate::store::VectorStore;
use crate::topk::SearchStats;

/// A built index.
#[derive(Debug, Clone)]
pub enum AnyIndex {
    /// Fitted on an empty dataset: every query returns no results.
    Empty { dimension: usize },
    #[cfg(feature = "lsh")]
    Lsh(LSHIndex),
    IvfFlat(IVFFlatIndex),
    /// Plain and rotated IVF-PQ.
    IvfPq(IVFPQIndex),
    #[cfg(feature = "sq")]
    IvfSq(IVFSQIndex),
    #[cfg(feature = "sq")]
    Sq(SQIndex),
}

impl AnyIndex {
    /// Build the index `config` describes over `store`.
    pub fn build(config: &IndexConfig, store: &VectorStore) -> Result<Self> {
        if store.is_empty() {
            info!("empty dataset, index holds no vectors");
            return Ok(Self::Empty {
                dimension: store.dimension(),
            });
        }

        Ok(match config {
            #[cfg(feature = "lsh")]
            IndexConfig::Lsh(p) => Self::Lsh(LSHIndex::build(store, p)?),
            IndexConfig::IvfFlat(p) => Self::IvfFlat(IVFFlatIndex::build(store, p)?),
            IndexConfig::IvfPq(p) => Self::IvfPq(IVFPQIndex::build(store, p)?),
            IndexConfig::IvfPqRotated(p) => {
                let params = IVFPQParams {
                    use_opq: true,
                    ..p.clone()
                };
                Self::IvfPq(IVFPQIndex::build(store, &params)?)
            }
            #[cfg(feature = "sq")]
            IndexConfig::IvfSq(p) => Self::IvfSq(IVFSQIndex::build(store, p)?),
            #[cfg(feature = "sq")]
            IndexConfig::Sq(p) => Self::Sq(SQIndex::build(store, p)?),
        })
    }

    fn inner(&self) -> Option<&dyn ANNIndex> {
        match self {
            Self::Empty { .. } => None,
            #[cfg(feature = "lsh")]
            Self::Lsh(i) => Some(i),
            Self::IvfFlat(i) => Some(i),
            Self::IvfPq(i) => Some(i),
            #[cfg(feature = "sq")]
            Self::IvfSq(i) => Some(i),
            #[cfg(feature = "sq")]
            Self::Sq(i) => Some(i),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_vectors() == 0
    }
}

impl ANNIndex for AnyIndex {
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        match self.inner() {
            Some(index) => index.search_with_stats(query, k, n_probe),
            None => {
                if k == 0 {
                    return Err(AnnError::InvalidArgument("k must be > 0".into()));
                }
                if n_probe == 0 {
                    return Err(AnnError::InvalidArgument("n_probe must be > 0".into()));
                }
                Ok((Vec::new(), SearchStats::default()))
            }
        }
    }

    fn size_bytes(&self) -> usize {
        self.inner().map_or(0, |i| i.size_bytes())
    }

    fn n_list(&self) -> Option<usize> {
        self.inner().and_then(|i| i.n_list())
    }

    fn algorithm(&self) -> &'static str {
        self.inner().map_or("empty", |i| i.algorithm())
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Empty { dimension } => *dimension,
            _ => self.inner().map_or(0, |i| i.dimension()),
        }
    }

    fn num_vectors(&self) -> usize {
        self.inner().map_or(0, |i| i.num_vectors())
    }
}
