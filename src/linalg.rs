//! Small dense linear algebra used by rotations (OPQ, LSH projections).
//!
//! Matrices are row-major `Vec<f32>`/`Vec<f64>`. Dimensions here are the
//! vector dimension (tens to a few thousand), so plain triple loops are fine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal sample via Box-Muller.
#[inline]
pub(crate) fn gaussian(rng: &mut StdRng) -> f32 {
    // Avoid ln(0).
    let u1: f32 = rng.random::<f32>().max(f32::MIN_POSITIVE);
    let u2: f32 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// `rows x dim` matrix of i.i.d. standard normal entries.
pub(crate) fn gaussian_rows(rows: usize, dim: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows * dim).map(|_| gaussian(&mut rng)).collect()
}

/// `rows x dim` matrix with orthonormal rows (`rows <= dim`), obtained by
/// Gram-Schmidt on Gaussian vectors.
pub(crate) fn random_orthonormal_rows(rows: usize, dim: usize, seed: u64) -> Vec<f32> {
    debug_assert!(rows <= dim);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut basis: Vec<Vec<f32>> = Vec::with_capacity(rows);

    while basis.len() < rows {
        let mut v: Vec<f32> = (0..dim).map(|_| gaussian(&mut rng)).collect();
        // Two passes of classical Gram-Schmidt keep the basis orthogonal in f32.
        for _ in 0..2 {
            for b in &basis {
                let proj: f32 = v.iter().zip(b).map(|(x, y)| x * y).sum();
                for (vi, bi) in v.iter_mut().zip(b) {
                    *vi -= proj * bi;
                }
            }
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            v.iter_mut().for_each(|x| *x /= norm);
            basis.push(v);
        }
    }

    basis.concat()
}

/// `out = M v` for a row-major `rows x cols` matrix.
#[inline]
pub(crate) fn mat_vec_into(m: &[f32], cols: usize, v: &[f32], out: &mut [f32]) {
    debug_assert_eq!(v.len(), cols);
    for (o, row) in out.iter_mut().zip(m.chunks_exact(cols)) {
        *o = row.iter().zip(v).map(|(a, b)| a * b).sum();
    }
}

/// Orthogonal polar factor of a square matrix via Newton-Schulz iteration.
///
/// For `M = U S Vᵀ` this converges to `U Vᵀ`, the orthogonal matrix closest to
/// `M` in Frobenius norm. Returns `None` when `M` is (numerically) singular,
/// where the iteration cannot produce an orthogonal result.
pub(crate) fn polar_orthogonal(m: &[f64], d: usize) -> Option<Vec<f32>> {
    const MAX_ITERATIONS: usize = 100;
    const TOLERANCE: f64 = 1e-10;

    let frob = m.iter().map(|x| x * x).sum::<f64>().sqrt();
    if frob <= f64::EPSILON {
        return None;
    }
    // Scaling by the Frobenius norm puts every singular value in (0, 1],
    // inside the (0, sqrt 3) convergence region.
    let mut x: Vec<f64> = m.iter().map(|v| v / frob).collect();

    for _ in 0..MAX_ITERATIONS {
        let xtx = matmul_tn(&x, &x, d);
        let mut err = 0.0;
        for i in 0..d {
            for j in 0..d {
                let target = if i == j { 1.0 } else { 0.0 };
                let diff = xtx[i * d + j] - target;
                err += diff * diff;
            }
        }
        if err < TOLERANCE {
            return Some(x.iter().map(|&v| v as f32).collect());
        }
        // X <- X (3I - XᵀX) / 2
        let mut inner = xtx;
        for (idx, v) in inner.iter_mut().enumerate() {
            let diag = if idx / d == idx % d { 3.0 } else { 0.0 };
            *v = 0.5 * (diag - *v);
        }
        x = matmul(&x, &inner, d);
    }

    None
}

/// `A B` for square row-major `d x d` matrices.
fn matmul(a: &[f64], b: &[f64], d: usize) -> Vec<f64> {
    let mut out = vec![0.0; d * d];
    for i in 0..d {
        for k in 0..d {
            let aik = a[i * d + k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..d {
                out[i * d + j] += aik * b[k * d + j];
            }
        }
    }
    out
}

/// `Aᵀ B` for square row-major `d x d` matrices.
fn matmul_tn(a: &[f64], b: &[f64], d: usize) -> Vec<f64> {
    let mut out = vec![0.0; d * d];
    for k in 0..d {
        for i in 0..d {
            let aki = a[k * d + i];
            if aki == 0.0 {
                continue;
            }
            for j in 0..d {
                out[i * d + j] += aki * b[k * d + j];
            }
        }
    }
    out
}

/// Max deviation of `M Mᵀ` from the identity, for row-orthonormality checks.
#[cfg(test)]
pub(crate) fn orthonormality_error(m: &[f32], rows: usize, cols: usize) -> f32 {
    let mut worst = 0.0f32;
    for i in 0..rows {
        for j in 0..rows {
            let dot: f32 = m[i * cols..(i + 1) * cols]
                .iter()
                .zip(&m[j * cols..(j + 1) * cols])
                .map(|(a, b)| a * b)
                .sum();
            let target = if i == j { 1.0 } else { 0.0 };
            worst = worst.max((dot - target).abs());
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthonormal_rows_are_orthonormal() {
        let m = random_orthonormal_rows(8, 16, 42);
        assert!(orthonormality_error(&m, 8, 16) < 1e-4);
    }

    #[test]
    fn polar_of_orthogonal_is_itself() {
        let q = random_orthonormal_rows(6, 6, 7);
        let q64: Vec<f64> = q.iter().map(|&v| v as f64).collect();
        let p = polar_orthogonal(&q64, 6).unwrap();
        for (a, b) in p.iter().zip(&q) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn polar_of_scaled_rotation_recovers_rotation() {
        let q = random_orthonormal_rows(4, 4, 3);
        // Q diag(5, 2, 1, 0.5) has polar factor Q.
        let scales = [5.0f64, 2.0, 1.0, 0.5];
        let mut m = vec![0.0f64; 16];
        for i in 0..4 {
            for j in 0..4 {
                m[i * 4 + j] = q[i * 4 + j] as f64 * scales[j];
            }
        }
        let p = polar_orthogonal(&m, 4).unwrap();
        assert!(orthonormality_error(&p, 4, 4) < 1e-4);
        for (a, b) in p.iter().zip(&q) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn polar_of_zero_is_none() {
        assert!(polar_orthogonal(&[0.0; 9], 3).is_none());
    }
}
