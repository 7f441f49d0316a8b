//! Index kind selection, as it appears in algorithm definitions.

use serde::{Deserialize, Serialize};

#[cfg(feature = "lsh")]
use crate::classic::lsh::LSHParams;
use crate::ivf::IVFFlatParams;
use crate::ivf_pq::IVFPQParams;
#[cfg(feature = "sq")]
use crate::quantization::{IVFSQParams, SQParams};

/// Which index to build, with its construction parameters.
///
/// ```json
/// {"kind": "ivf_pq", "n_list": 100, "m": 8, "n_bits": 8}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexConfig {
    #[cfg(feature = "lsh")]
    Lsh(LSHParams),
    IvfFlat(IVFFlatParams),
    IvfPq(IVFPQParams),
    /// IVF-PQ behind a learned OPQ rotation (`use_opq` is implied).
    IvfPqRotated(IVFPQParams),
    #[cfg(feature = "sq")]
    IvfSq(IVFSQParams),
    #[cfg(feature = "sq")]
    Sq(SQParams),
}

impl IndexConfig {
    /// Number of coarse cells for IVF kinds.
    pub fn n_list(&self) -> Option<usize> {
        match self {
            Self::IvfFlat(p) => Some(p.n_list),
            Self::IvfPq(p) | Self::IvfPqRotated(p) => Some(p.n_list),
            #[cfg(feature = "sq")]
            Self::IvfSq(p) => Some(p.n_list),
            #[cfg(feature = "lsh")]
            Self::Lsh(_) => None,
            #[cfg(feature = "sq")]
            Self::Sq(_) => None,
        }
    }

    /// Whether queries take an `n_probe` argument.
    pub fn is_ivf(&self) -> bool {
        self.n_list().is_some()
    }

    /// Human-readable name including the current `n_probe`, used as the
    /// run label in benchmark results.
    pub fn display_name(&self, n_probe: usize) -> String {
        match self {
            #[cfg(feature = "lsh")]
            Self::Lsh(p) => format!("LSH(n_bits={})", p.n_bits),
            Self::IvfFlat(p) => format!("IVF(n_list={}, n_probe={n_probe})", p.n_list),
            Self::IvfPq(p) => format!(
                "IVFPQ(n_list={}, n_probe={n_probe}, m={})",
                p.n_list, p.m
            ),
            Self::IvfPqRotated(p) => format!(
                "OIVFPQ(n_list={}, n_probe={n_probe}, m={})",
                p.n_list, p.m
            ),
            #[cfg(feature = "sq")]
            Self::IvfSq(p) => format!(
                "IVFSQ(n_probe={n_probe}, qname={}, n_centroids={})",
                p.qtype, p.n_list
            ),
            #[cfg(feature = "sq")]
            Self::Sq(p) => format!("SQ(qname={})", p.qtype),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::IvfPq(IVFPQParams::default())
    }
}
