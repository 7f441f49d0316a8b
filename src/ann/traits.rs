//! Unified trait for all ANN indexes.

use crate::error::Result;
use crate::ivf::IVFFlatIndex;
use crate::ivf_pq::IVFPQIndex;
use crate::topk::SearchStats;

/// Read-only search interface shared by every built index.
///
/// Indexes are immutable once built, so `&self` search is safe to call from
/// many threads at once.
pub trait ANNIndex: Send + Sync {
    /// Up to `k` `(id, distance)` pairs, ascending by distance then id.
    ///
    /// `n_probe` is the number of cells scanned by IVF indexes; exhaustive
    /// indexes ignore it.
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)>;

    fn search(&self, query: &[f32], k: usize, n_probe: usize) -> Result<Vec<(u32, f32)>> {
        self.search_with_stats(query, k, n_probe)
            .map(|(hits, _)| hits)
    }

    /// Approximate index size in bytes.
    fn size_bytes(&self) -> usize;

    /// Number of coarse cells, for IVF indexes.
    fn n_list(&self) -> Option<usize> {
        None
    }

    /// Short algorithm label ("IVF-PQ", "LSH", ...).
    fn algorithm(&self) -> &'static str;

    fn dimension(&self) -> usize;

    fn num_vectors(&self) -> usize;

    fn stats(&self) -> ANNStats {
        ANNStats {
            num_vectors: self.num_vectors(),
            dimension: self.dimension(),
            size_bytes: self.size_bytes(),
            algorithm: self.algorithm().to_string(),
        }
    }
}

/// Statistics about an ANN index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ANNStats {
    pub num_vectors: usize,
    pub dimension: usize,
    pub size_bytes: usize,
    pub algorithm: String,
}

impl ANNIndex for IVFFlatIndex {
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        IVFFlatIndex::search_with_stats(self, query, k, n_probe)
    }

    fn size_bytes(&self) -> usize {
        IVFFlatIndex::size_bytes(self)
    }

    fn n_list(&self) -> Option<usize> {
        Some(IVFFlatIndex::n_list(self))
    }

    fn algorithm(&self) -> &'static str {
        "IVF-Flat"
    }

    fn dimension(&self) -> usize {
        IVFFlatIndex::dimension(self)
    }

    fn num_vectors(&self) -> usize {
        IVFFlatIndex::num_vectors(self)
    }
}

impl ANNIndex for IVFPQIndex {
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        IVFPQIndex::search_with_stats(self, query, k, n_probe)
    }

    fn size_bytes(&self) -> usize {
        IVFPQIndex::size_bytes(self)
    }

    fn n_list(&self) -> Option<usize> {
        Some(IVFPQIndex::n_list(self))
    }

    fn algorithm(&self) -> &'static str {
        if self.opq().is_some() {
            "OPQ+IVF-PQ"
        } else {
            "IVF-PQ"
        }
    }

    fn dimension(&self) -> usize {
        IVFPQIndex::dimension(self)
    }

    fn num_vectors(&self) -> usize {
        IVFPQIndex::num_vectors(self)
    }
}

#[cfg(feature = "sq")]
impl ANNIndex for crate::quantization::IVFSQIndex {
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        crate::quantization::IVFSQIndex::search_with_stats(self, query, k, n_probe)
    }

    fn size_bytes(&self) -> usize {
        crate::quantization::IVFSQIndex::size_bytes(self) + self.codec().size_bytes()
    }

    fn n_list(&self) -> Option<usize> {
        Some(crate::quantization::IVFSQIndex::n_list(self))
    }

    fn algorithm(&self) -> &'static str {
        "IVF-SQ"
    }

    fn dimension(&self) -> usize {
        crate::quantization::IVFSQIndex::dimension(self)
    }

    fn num_vectors(&self) -> usize {
        crate::quantization::IVFSQIndex::num_vectors(self)
    }
}

#[cfg(feature = "sq")]
impl ANNIndex for crate::quantization::SQIndex {
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        _n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        crate::quantization::SQIndex::search_with_stats(self, query, k)
    }

    fn size_bytes(&self) -> usize {
        crate::quantization::SQIndex::size_bytes(self)
    }

    fn algorithm(&self) -> &'static str {
        "SQ"
    }

    fn dimension(&self) -> usize {
        crate::quantization::SQIndex::dimension(self)
    }

    fn num_vectors(&self) -> usize {
        crate::quantization::SQIndex::num_vectors(self)
    }
}

#[cfg(feature = "lsh")]
impl ANNIndex for crate::classic::lsh::LSHIndex {
    fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        _n_probe: usize,
    ) -> Result<(Vec<(u32, f32)>, SearchStats)> {
        crate::classic::lsh::LSHIndex::search_with_stats(self, query, k)
    }

    fn size_bytes(&self) -> usize {
        crate::classic::lsh::LSHIndex::size_bytes(self)
    }

    fn algorithm(&self) -> &'static str {
        "LSH"
    }

    fn dimension(&self) -> usize {
        crate::classic::lsh::LSHIndex::dimension(self)
    }

    fn num_vectors(&self) -> usize {
        crate::classic::lsh::LSHIndex::num_vectors(self)
    }
}
