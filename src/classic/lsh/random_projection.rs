//! Random projection hashing: `n_bits` hyperplanes, one bit each.

use serde::{Deserialize, Serialize};

use crate::linalg::{gaussian_rows, mat_vec_into, random_orthonormal_rows};

/// Projects a vector onto `n_bits` directions and thresholds each coordinate.
///
/// With `n_bits <= dimension` the directions are orthonormal rows of a random
/// rotation; beyond that they are independent Gaussian directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomProjection {
    dimension: usize,
    n_bits: usize,
    /// Row-major `n_bits x dimension`.
    directions: Vec<f32>,
    thresholds: Vec<f32>,
}

impl RandomProjection {
    pub fn new(dimension: usize, n_bits: usize, seed: u64) -> Self {
        let directions = if n_bits <= dimension {
            random_orthonormal_rows(n_bits, dimension, seed)
        } else {
            gaussian_rows(n_bits, dimension, seed)
        };
        Self {
            dimension,
            n_bits,
            directions,
            thresholds: vec![0.0; n_bits],
        }
    }

    /// Set each bit's threshold to the median projection of `num_vectors`
    /// rows of `vectors`, so every bit splits the data in half.
    pub fn train_thresholds(&mut self, vectors: &[f32], num_vectors: usize) {
        if num_vectors == 0 {
            return;
        }
        let mut projected = vec![0.0f32; num_vectors * self.n_bits];
        for (row, out) in vectors
            .chunks_exact(self.dimension)
            .take(num_vectors)
            .zip(projected.chunks_exact_mut(self.n_bits))
        {
            self.project_into(row, out);
        }

        let mut column = vec![0.0f32; num_vectors];
        for (bit, threshold) in self.thresholds.iter_mut().enumerate() {
            for (c, row) in column.iter_mut().zip(projected.chunks_exact(self.n_bits)) {
                *c = row[bit];
            }
            let mid = num_vectors / 2;
            let (_, median, _) = column.select_nth_unstable_by(mid, f32::total_cmp);
            *threshold = *median;
        }
    }

    pub fn project_into(&self, vector: &[f32], out: &mut [f32]) {
        mat_vec_into(&self.directions, self.dimension, vector, out);
    }

    /// Hash into `words()` packed `u64`s; bit `i` is `projection_i > threshold_i`.
    pub fn hash_into(&self, vector: &[f32], projected: &mut [f32], words: &mut [u64]) {
        self.project_into(vector, projected);
        words.fill(0);
        for (i, (&p, &t)) in projected.iter().zip(&self.thresholds).enumerate() {
            if p > t {
                words[i / 64] |= 1u64 << (i % 64);
            }
        }
    }

    pub fn words(&self) -> usize {
        self.n_bits.div_ceil(64)
    }

    pub fn n_bits(&self) -> usize {
        self.n_bits
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn size_bytes(&self) -> usize {
        (self.directions.len() + self.thresholds.len()) * std::mem::size_of::<f32>()
    }
}

/// Number of differing bits.
#[inline]
pub fn hamming(a: &[u64], b: &[u64]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}
