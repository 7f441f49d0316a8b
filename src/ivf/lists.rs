//! Per-cell `(id, code)` storage.

use rayon::prelude::*;
use tracing::{debug, info};

use super::ListCodec;
use crate::distance::residual_into;
use crate::error::{AnnError, Result};
use crate::partitioning::CoarseQuantizer;
use crate::store::VectorStore;

/// Vectors are assigned and encoded in parallel chunks of this many rows,
/// then appended in id order.
const BUILD_CHUNK: usize = 8192;

/// One inverted list. Codes are flattened with stride `code_len`.
#[derive(Debug, Clone, Default)]
struct InvertedList<T> {
    ids: Vec<u32>,
    codes: Vec<T>,
}

/// Inverted lists keyed by coarse cell.
///
/// Every indexed id lives in exactly one list, and ids inside a list are
/// ascending (build appends in id order).
#[derive(Debug, Clone)]
pub struct InvertedLists<T> {
    code_len: usize,
    lists: Vec<InvertedList<T>>,
}

/// Read access to a single list.
#[derive(Debug, Clone, Copy)]
pub struct ListView<'a, T> {
    ids: &'a [u32],
    codes: &'a [T],
    code_len: usize,
}

impl<'a, T> ListView<'a, T> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &'a [u32] {
        self.ids
    }

    /// Code of the `pos`-th entry.
    pub fn code(&self, pos: usize) -> &'a [T] {
        &self.codes[pos * self.code_len..(pos + 1) * self.code_len]
    }

    /// `(id, code)` pairs in list order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &'a [T])> + 'a {
        let ids = self.ids;
        ids.iter()
            .copied()
            .zip(self.codes.chunks_exact(self.code_len.max(1)))
    }
}

impl<T: Copy + Default + Send + Sync> InvertedLists<T> {
    /// `n_list` empty lists for codes of `code_len` elements.
    pub fn new(n_list: usize, code_len: usize) -> Self {
        Self {
            code_len,
            lists: (0..n_list)
                .map(|_| InvertedList {
                    ids: Vec::new(),
                    codes: Vec::new(),
                })
                .collect(),
        }
    }

    /// Assign every stored vector to its nearest cell, encode it (or its
    /// residual) with `codec`, and append `(id, code)` to that cell's list.
    pub fn build<C>(store: &VectorStore, coarse: &CoarseQuantizer, codec: &C) -> Result<Self>
    where
        C: ListCodec<Code = T>,
    {
        if store.dimension() != coarse.dimension() || codec.dimension() != coarse.dimension() {
            return Err(AnnError::DimensionMismatch {
                expected: coarse.dimension(),
                actual: if store.dimension() != coarse.dimension() {
                    store.dimension()
                } else {
                    codec.dimension()
                },
            });
        }
        if store.len() > u32::MAX as usize {
            return Err(AnnError::InvalidArgument(format!(
                "{} vectors exceed the u32 id space",
                store.len()
            )));
        }

        let code_len = codec.code_len();
        let by_residual = codec.by_residual();
        let dim = store.dimension();
        let mut lists = Self::new(coarse.n_list(), code_len);

        let mut start = 0;
        while start < store.len() {
            let end = (start + BUILD_CHUNK).min(store.len());
            let encoded: Vec<(usize, Vec<T>)> = (start..end)
                .into_par_iter()
                .map_init(
                    || vec![0.0f32; dim],
                    |residual, i| {
                        let v = store.get(i);
                        let cell = coarse.assign(v);
                        let mut code = vec![T::default(); code_len];
                        if by_residual {
                            residual_into(v, coarse.centroid_unchecked(cell), residual);
                            codec.encode_into(residual, &mut code);
                        } else {
                            codec.encode_into(v, &mut code);
                        }
                        (cell, code)
                    },
                )
                .collect();

            for (offset, (cell, code)) in encoded.into_iter().enumerate() {
                lists.append(cell, (start + offset) as u32, &code)?;
            }
            debug!(encoded = end, total = store.len(), "inverted list build progress");
            start = end;
        }

        info!(
            n_list = lists.n_lists(),
            total = lists.total_len(),
            code_len,
            imbalance = lists.imbalance_factor(),
            "built inverted lists"
        );

        Ok(lists)
    }

    /// Append one entry to list `cell`.
    pub fn append(&mut self, cell: usize, id: u32, code: &[T]) -> Result<()> {
        if code.len() != self.code_len {
            return Err(AnnError::InvalidArgument(format!(
                "code has {} elements, lists expect {}",
                code.len(),
                self.code_len
            )));
        }
        let n_list = self.lists.len();
        let list = self.lists.get_mut(cell).ok_or(AnnError::OutOfRange {
            index: cell,
            len: n_list,
        })?;
        list.ids.push(id);
        list.codes.extend_from_slice(code);
        Ok(())
    }
}

impl<T> InvertedLists<T> {
    /// Entries of list `cell`.
    pub fn list_for(&self, cell: usize) -> Result<ListView<'_, T>> {
        let list = self.lists.get(cell).ok_or(AnnError::OutOfRange {
            index: cell,
            len: self.lists.len(),
        })?;
        Ok(ListView {
            ids: &list.ids,
            codes: &list.codes,
            code_len: self.code_len,
        })
    }

    pub fn n_lists(&self) -> usize {
        self.lists.len()
    }

    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// Total number of indexed entries across lists.
    pub fn total_len(&self) -> usize {
        self.lists.iter().map(|l| l.ids.len()).sum()
    }

    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(|l| l.ids.len()).collect()
    }

    /// `n_list · Σ size² / (Σ size)²`: 1.0 for perfectly even lists, larger
    /// when a few lists dominate (and dominate search cost).
    pub fn imbalance_factor(&self) -> f64 {
        let total = self.total_len() as f64;
        if total == 0.0 {
            return 1.0;
        }
        let sum_sq: f64 = self
            .lists
            .iter()
            .map(|l| (l.ids.len() as f64).powi(2))
            .sum();
        self.lists.len() as f64 * sum_sq / (total * total)
    }

    pub fn size_bytes(&self) -> usize {
        self.lists
            .iter()
            .map(|l| {
                l.ids.len() * std::mem::size_of::<u32>() + l.codes.len() * std::mem::size_of::<T>()
            })
            .sum()
    }
}
