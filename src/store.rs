//! Flat in-memory vector storage.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::distance::Metric;
use crate::error::{AnnError, Result};

/// Row-major `f32` storage for `len` vectors of `dimension` components.
///
/// Populated once at fit time; ids are row positions.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    data: Vec<f32>,
    dimension: usize,
    len: usize,
}

impl VectorStore {
    /// Wrap an already flattened buffer.
    pub fn from_flat(data: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(AnnError::InvalidConfig("dimension must be > 0".into()));
        }
        if data.len() % dimension != 0 {
            return Err(AnnError::InvalidArgument(format!(
                "flat buffer of {} values is not a multiple of dimension {dimension}",
                data.len()
            )));
        }
        let len = data.len() / dimension;
        Ok(Self {
            data,
            dimension,
            len,
        })
    }

    /// Copy rows into a store, rejecting ragged input.
    ///
    /// Rows of any float type convertible to `f32` are accepted so callers can
    /// hand over `f64` datasets unchanged.
    pub fn from_rows<R, T>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[T]>,
        T: Copy + Into<f64>,
    {
        let Some(first) = rows.first() else {
            return Ok(Self::default());
        };
        let dimension = first.as_ref().len();
        if dimension == 0 {
            return Err(AnnError::InvalidConfig("dimension must be > 0".into()));
        }

        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            let row = row.as_ref();
            if row.len() != dimension {
                return Err(AnnError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            data.extend(row.iter().map(|&x| Into::<f64>::into(x) as f32));
        }

        Ok(Self {
            data,
            dimension,
            len: rows.len(),
        })
    }

    /// Apply the metric's preprocessing to every stored row.
    pub fn prepare(&mut self, metric: Metric) {
        if !metric.normalizes() || self.dimension == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(self.dimension) {
            metric.prepare(row);
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Row `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> &[f32] {
        let start = idx * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// The whole flat buffer.
    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dimension.max(1)).take(self.len)
    }

    /// Seeded random subset of at most `max` rows, flattened.
    ///
    /// Returns the whole buffer when `max >= len`.
    pub fn sample(&self, max: usize, seed: u64) -> Vec<f32> {
        sample_rows(&self.data, self.dimension, self.len, max, seed)
    }

    /// Approximate heap footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Seeded random subset of at most `max` of the first `n` rows of `data`,
/// flattened in ascending row order.
pub(crate) fn sample_rows(data: &[f32], dimension: usize, n: usize, max: usize, seed: u64) -> Vec<f32> {
    if max >= n {
        return data[..n * dimension].to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, n, max).into_vec();
    picked.sort_unstable();

    let mut out = Vec::with_capacity(max * dimension);
    for i in picked {
        out.extend_from_slice(&data[i * dimension..(i + 1) * dimension]);
    }
    out
}
