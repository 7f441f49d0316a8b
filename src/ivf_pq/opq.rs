//! Optimized Product Quantization (OPQ): a learned rotation applied before PQ.
//!
//! PQ quantizes contiguous segments independently, which wastes codewords
//! when energy is unevenly spread across segments or correlated between
//! them. OPQ looks for an orthogonal `R` minimizing `Σ ||R x - pq(R x)||²`,
//! alternating between:
//!
//! 1. fixing `R`, training a PQ on rotated vectors and reconstructing them;
//! 2. fixing the reconstructions `ŷ`, solving the orthogonal Procrustes
//!    problem `R = polar(Σ ŷ xᵀ)`.
//!
//! ## References
//!
//! - Ge, He, Ke, Sun (2014). "Optimized Product Quantization."

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::pq::ProductQuantizer;
use crate::distance::l2_squared;
use crate::error::{AnnError, Result};
use crate::linalg::{mat_vec_into, polar_orthogonal, random_orthonormal_rows};
use crate::partitioning::TrainParams;
use crate::store::{sample_rows, VectorStore};

/// Default number of alternating OPQ iterations.
pub const DEFAULT_OPQ_ITERATIONS: usize = 4;

/// A learned `dimension x dimension` orthogonal rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpqMatrix {
    dimension: usize,
    /// Row-major; `apply(x) = R x`.
    rotation: Vec<f32>,
    /// Mean squared PQ reconstruction error after each iteration.
    distortions: Vec<f32>,
}

impl OpqMatrix {
    /// Learn a rotation for a PQ with `m` segments of `2^n_bits` codewords
    /// from `num_vectors` rows of `vectors`.
    pub fn train(
        vectors: &[f32],
        num_vectors: usize,
        dimension: usize,
        m: usize,
        n_bits: usize,
        iterations: usize,
        params: &TrainParams,
    ) -> Result<Self> {
        ProductQuantizer::validate(dimension, m, n_bits)?;
        let ksub = 1usize << n_bits;
        if num_vectors < ksub {
            return Err(AnnError::InsufficientData {
                what: "opq rotation",
                needed: ksub,
                available: num_vectors,
            });
        }

        let cap = params.max_points_per_centroid.saturating_mul(ksub).max(ksub);
        let sample = sample_rows(vectors, dimension, num_vectors, cap, params.seed);
        let n_train = sample.len() / dimension;

        let mut rotation = random_orthonormal_rows(dimension, dimension, params.seed);
        let mut distortions = Vec::with_capacity(iterations);
        let mut rotated = vec![0.0f32; sample.len()];

        for iteration in 0..iterations {
            rotate_rows(&rotation, dimension, &sample, &mut rotated);
            let pq = ProductQuantizer::train(&rotated, n_train, dimension, m, n_bits, params)?;

            // Σ ŷ xᵀ in f64; the sums run over up to 65k rows.
            let mut cross = vec![0.0f64; dimension * dimension];
            let mut distortion = 0.0f64;
            for (x, y) in sample
                .chunks_exact(dimension)
                .zip(rotated.chunks_exact(dimension))
            {
                let y_hat = pq.decode(&pq.encode(y));
                distortion += l2_squared(y, &y_hat) as f64;
                for (i, &yi) in y_hat.iter().enumerate() {
                    let row = &mut cross[i * dimension..(i + 1) * dimension];
                    for (c, &xj) in row.iter_mut().zip(x) {
                        *c += yi as f64 * xj as f64;
                    }
                }
            }
            let distortion = (distortion / n_train as f64) as f32;
            distortions.push(distortion);
            debug!(iteration, distortion, "opq iteration");

            match polar_orthogonal(&cross, dimension) {
                Some(r) => rotation = r,
                None => {
                    warn!(iteration, "opq cross-covariance is singular, keeping previous rotation");
                    break;
                }
            }
        }

        info!(
            dimension,
            m,
            n_bits,
            n_train,
            iterations = distortions.len(),
            final_distortion = distortions.last().copied(),
            "trained opq rotation"
        );

        Ok(Self {
            dimension,
            rotation,
            distortions,
        })
    }

    /// `R x`.
    pub fn apply(&self, vector: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; self.dimension];
        self.apply_into(vector, &mut out);
        out
    }

    pub fn apply_into(&self, vector: &[f32], out: &mut [f32]) {
        mat_vec_into(&self.rotation, self.dimension, vector, out);
    }

    /// Rotate every vector of `store`.
    pub fn apply_store(&self, store: &VectorStore) -> Result<VectorStore> {
        if store.dimension() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                actual: store.dimension(),
            });
        }
        let mut out = vec![0.0f32; store.as_flat().len()];
        rotate_rows(&self.rotation, self.dimension, store.as_flat(), &mut out);
        VectorStore::from_flat(out, self.dimension)
    }

    pub fn rotation(&self) -> &[f32] {
        &self.rotation
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Mean squared reconstruction error measured at each training iteration.
    pub fn distortions(&self) -> &[f32] {
        &self.distortions
    }

    pub fn size_bytes(&self) -> usize {
        self.rotation.len() * std::mem::size_of::<f32>()
    }
}

fn rotate_rows(rotation: &[f32], dimension: usize, input: &[f32], out: &mut [f32]) {
    out.par_chunks_exact_mut(dimension)
        .zip(input.par_chunks_exact(dimension))
        .for_each(|(o, x)| mat_vec_into(rotation, dimension, x, o));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::norm;
    use crate::linalg::orthonormality_error;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Energy concentrated in the first half of the dimensions, with the
    /// second half a noisy copy: plain PQ splits this badly.
    fn correlated(n: usize, d: usize, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let half = d / 2;
        let mut out = Vec::with_capacity(n * d);
        for _ in 0..n {
            let base: Vec<f32> = (0..half).map(|_| rng.random_range(-1.0..1.0)).collect();
            out.extend_from_slice(&base);
            out.extend(base.iter().map(|b| b + rng.random_range(-0.05..0.05)));
        }
        out
    }

    fn trained() -> (OpqMatrix, Vec<f32>) {
        let data = correlated(500, 8, 5);
        let opq = OpqMatrix::train(&data, 500, 8, 4, 4, 4, &TrainParams::default()).unwrap();
        (opq, data)
    }

    #[test]
    fn rotation_is_orthogonal() {
        let (opq, _) = trained();
        assert!(orthonormality_error(opq.rotation(), 8, 8) < 1e-3);
    }

    #[test]
    fn apply_preserves_norms_and_distances() {
        let (opq, data) = trained();
        let a = &data[0..8];
        let b = &data[8..16];
        let (ra, rb) = (opq.apply(a), opq.apply(b));
        assert!((norm(a) - norm(&ra)).abs() < 1e-3);
        assert!((l2_squared(a, b) - l2_squared(&ra, &rb)).abs() < 1e-3);
    }

    #[test]
    fn distortion_does_not_blow_up() {
        let (opq, _) = trained();
        let d = opq.distortions();
        assert_eq!(d.len(), 4);
        assert!(d[d.len() - 1] <= d[0] * 1.1, "{d:?}");
    }

    #[test]
    fn rejects_indivisible_dimension() {
        let data = correlated(100, 8, 1);
        assert!(matches!(
            OpqMatrix::train(&data, 100, 8, 3, 4, 2, &TrainParams::default()),
            Err(AnnError::InvalidConfig(_))
        ));
    }

    #[test]
    fn apply_store_rotates_every_row() {
        let (opq, data) = trained();
        let store = VectorStore::from_flat(data[..80].to_vec(), 8).unwrap();
        let rotated = opq.apply_store(&store).unwrap();
        assert_eq!(rotated.len(), 10);
        assert_eq!(rotated.get(3), opq.apply(store.get(3)).as_slice());
    }
}
