//! Distance kernels and the metric vocabulary shared by every index kind.
//!
//! All indexes rank by **squared** Euclidean distance. The angular metric is
//! handled by L2-normalizing vectors on the way in (at fit and at query time),
//! after which squared-L2 ranking equals cosine ranking:
//!
//! ```text
//! ||a - b||² = 2 - 2·cos(a, b)     when ||a|| = ||b|| = 1
//! ```

use serde::{Deserialize, Serialize};

const NORM_EPSILON: f32 = 1e-10;

/// Metric selected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine ranking: vectors are L2-normalized before storage and search.
    Angular,
    /// Raw squared Euclidean ranking.
    #[default]
    Euclidean,
}

impl Metric {
    /// Whether inputs must be normalized before they reach an index.
    #[inline]
    #[must_use]
    pub fn normalizes(self) -> bool {
        matches!(self, Metric::Angular)
    }

    /// Prepare a vector in place for this metric.
    #[inline]
    pub fn prepare(self, v: &mut [f32]) {
        if self.normalizes() {
            normalize_in_place(v);
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Angular => f.write_str("angular"),
            Metric::Euclidean => f.write_str("euclidean"),
        }
    }
}

/// Dot product.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
#[inline]
#[must_use]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Normalize to unit L2 norm. Zero vectors are left untouched.
#[inline]
pub fn normalize_in_place(v: &mut [f32]) {
    let n = norm(v);
    if n > NORM_EPSILON {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
}

/// Normalized copy of `v`.
#[inline]
#[must_use]
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// Write `a - b` into `out`.
#[inline]
pub fn residual_into(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), out.len());
    for ((o, x), y) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
        *o = x - y;
    }
}
