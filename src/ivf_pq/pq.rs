//! Product Quantization (PQ) over residual vectors.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::distance::l2_squared;
use crate::error::{AnnError, Result};
use crate::ivf::ListCodec;
use crate::partitioning::kmeans::nearest_row;
use crate::partitioning::{KMeans, TrainParams};
use crate::store::sample_rows;

/// Product Quantizer.
///
/// Splits a `dimension`-vector into `m` contiguous segments of `dsub`
/// components and replaces each segment by the index of its nearest codeword
/// in that segment's codebook of `2^n_bits` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuantizer {
    dimension: usize,
    m: usize,
    n_bits: usize,
    ksub: usize,
    dsub: usize,
    /// `[segment][codeword][dsub]`, flattened.
    codebooks: Vec<f32>,
}

/// Per-query squared distances from each query segment to every codeword.
///
/// `m` contiguous rows of `ksub` entries; row `s` belongs to segment `s`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    m: usize,
    ksub: usize,
    values: Vec<f32>,
}

impl DistanceTable {
    /// Approximate squared distance to an encoded vector: `m` lookups.
    #[inline]
    pub fn score(&self, code: &[u8]) -> f32 {
        code.iter()
            .zip(self.values.chunks_exact(self.ksub))
            .map(|(&c, row)| row[c as usize])
            .sum()
    }

    /// Distances for segment `s`.
    pub fn row(&self, s: usize) -> &[f32] {
        &self.values[s * self.ksub..(s + 1) * self.ksub]
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn ksub(&self) -> usize {
        self.ksub
    }
}

impl ProductQuantizer {
    /// Check a `(dimension, m, n_bits)` combination without training.
    ///
    /// Dimensions not divisible by `m` are rejected rather than padded.
    pub fn validate(dimension: usize, m: usize, n_bits: usize) -> Result<()> {
        if dimension == 0 {
            return Err(AnnError::InvalidConfig("dimension must be > 0".into()));
        }
        if m == 0 {
            return Err(AnnError::InvalidConfig("m must be > 0".into()));
        }
        if dimension % m != 0 {
            return Err(AnnError::InvalidConfig(format!(
                "dimension {dimension} is not divisible by m = {m}"
            )));
        }
        if !(1..=8).contains(&n_bits) {
            return Err(AnnError::InvalidConfig(format!(
                "n_bits must be in 1..=8, got {n_bits}"
            )));
        }
        Ok(())
    }

    /// Train one codebook per segment on `num_vectors` rows of `residuals`.
    ///
    /// At most `max_points_per_centroid * 2^n_bits` rows are used; segments
    /// are trained in parallel, each with its own derived seed.
    pub fn train(
        residuals: &[f32],
        num_vectors: usize,
        dimension: usize,
        m: usize,
        n_bits: usize,
        params: &TrainParams,
    ) -> Result<Self> {
        Self::validate(dimension, m, n_bits)?;
        if residuals.len() < num_vectors * dimension {
            return Err(AnnError::InvalidArgument(format!(
                "buffer holds {} values, expected {num_vectors} x {dimension}",
                residuals.len()
            )));
        }
        let ksub = 1usize << n_bits;
        if num_vectors < ksub {
            return Err(AnnError::InsufficientData {
                what: "product quantizer",
                needed: ksub,
                available: num_vectors,
            });
        }

        let dsub = dimension / m;
        let cap = params.max_points_per_centroid.saturating_mul(ksub).max(ksub);
        let sample = sample_rows(residuals, dimension, num_vectors, cap, params.seed);
        let n_train = sample.len() / dimension;

        let segments: Vec<Vec<f32>> = (0..m)
            .into_par_iter()
            .map(|s| -> Result<Vec<f32>> {
                let mut sub = Vec::with_capacity(n_train * dsub);
                for row in sample.chunks_exact(dimension) {
                    sub.extend_from_slice(&row[s * dsub..(s + 1) * dsub]);
                }
                let mut kmeans = KMeans::new(dsub, ksub)?
                    .with_seed(params.seed.wrapping_add(s as u64))
                    .with_max_iterations(params.max_iterations)
                    .with_purpose("pq segment");
                kmeans.fit(&sub, n_train)?;
                Ok(kmeans.into_centroids())
            })
            .collect::<Result<_>>()?;

        info!(dimension, m, n_bits, n_train, "trained product quantizer");

        Ok(Self {
            dimension,
            m,
            n_bits,
            ksub,
            dsub,
            codebooks: segments.concat(),
        })
    }

    /// Nearest codeword per segment; ties go to the lowest codeword index.
    pub fn encode(&self, residual: &[f32]) -> Vec<u8> {
        let mut code = vec![0u8; self.m];
        self.encode_into(residual, &mut code);
        code
    }

    /// [`Self::encode`] into a caller-owned buffer of `m` bytes.
    pub fn encode_into(&self, residual: &[f32], out: &mut [u8]) {
        debug_assert_eq!(residual.len(), self.dimension);
        for (s, (sub, slot)) in residual
            .chunks_exact(self.dsub)
            .zip(out.iter_mut())
            .enumerate()
        {
            // ksub <= 256, so the index fits.
            *slot = nearest_row(self.segment(s), self.dsub, sub).0 as u8;
        }
    }

    /// Concatenated codewords of `code`.
    pub fn decode(&self, code: &[u8]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimension);
        for (s, &c) in code.iter().enumerate().take(self.m) {
            out.extend_from_slice(self.codeword(s, c as usize));
        }
        out
    }

    /// Distance table for one (residual) query.
    pub fn distance_table(&self, query: &[f32]) -> DistanceTable {
        let mut table = ListCodec::new_table(self);
        self.compute_table_into(query, &mut table);
        table
    }

    /// Refill `table` for a new query without reallocating.
    pub fn compute_table_into(&self, query: &[f32], table: &mut DistanceTable) {
        debug_assert_eq!(query.len(), self.dimension);
        table.m = self.m;
        table.ksub = self.ksub;
        table.values.resize(self.m * self.ksub, 0.0);
        for (s, (sub, row)) in query
            .chunks_exact(self.dsub)
            .zip(table.values.chunks_exact_mut(self.ksub))
            .enumerate()
        {
            for (slot, codeword) in row.iter_mut().zip(self.segment(s).chunks_exact(self.dsub)) {
                *slot = l2_squared(sub, codeword);
            }
        }
    }

    /// Codeword `c` of segment `s`.
    pub fn codeword(&self, s: usize, c: usize) -> &[f32] {
        let start = (s * self.ksub + c) * self.dsub;
        &self.codebooks[start..start + self.dsub]
    }

    fn segment(&self, s: usize) -> &[f32] {
        let len = self.ksub * self.dsub;
        &self.codebooks[s * len..(s + 1) * len]
    }

    pub fn codebooks(&self) -> &[f32] {
        &self.codebooks
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn n_bits(&self) -> usize {
        self.n_bits
    }

    pub fn ksub(&self) -> usize {
        self.ksub
    }

    pub fn dsub(&self) -> usize {
        self.dsub
    }

    pub fn size_bytes(&self) -> usize {
        self.codebooks.len() * std::mem::size_of::<f32>()
    }
}

impl ListCodec for ProductQuantizer {
    type Code = u8;
    type Table = DistanceTable;

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn code_len(&self) -> usize {
        self.m
    }

    fn encode_into(&self, input: &[f32], out: &mut [u8]) {
        ProductQuantizer::encode_into(self, input, out);
    }

    fn new_table(&self) -> DistanceTable {
        DistanceTable {
            m: self.m,
            ksub: self.ksub,
            values: vec![0.0; self.m * self.ksub],
        }
    }

    fn prepare_into(&self, query: &[f32], table: &mut DistanceTable) {
        self.compute_table_into(query, table);
    }

    #[inline]
    fn score(&self, table: &DistanceTable, code: &[u8]) -> f32 {
        table.score(code)
    }
}
