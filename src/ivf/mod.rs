//! IVF: inverted-file indexes over a coarse k-means partition.
//!
//! Partition the space into `n_list` Voronoi cells, store every vector in the
//! list of its nearest cell, and at query time only scan the `n_probe` cells
//! nearest to the query.
//!
//! ```text
//!           Query
//!             |
//!     +-------+-------+
//!     |               |
//!   Cell A          Cell B      (probe 2 cells)
//!   |__|__|         |__|__|
//!   v  v  v         v  v  v
//!  [codes]         [codes]      (score codes within cells)
//! ```
//!
//! What a list stores per vector is decided by a [`ListCodec`]: raw floats
//! (IVF-Flat), scalar-quantized residuals (IVF-SQ), or product-quantized
//! residuals (IVF-PQ, see `crate::ivf_pq`). The probe / score / top-k engine
//! in [`IVFIndex`] is shared by all of them.
//!
//! | Parameter | ↑ Effect |
//! |-----------|----------|
//! | `n_probe` | Better recall, slower search |
//! | `n_list` | Finer partition, slower training, fewer candidates per probe |

pub mod flat;
pub mod index;
pub mod lists;

pub use flat::{FlatCodec, IVFFlatIndex, IVFFlatParams};
pub use index::IVFIndex;
pub use lists::{InvertedLists, ListView};

/// How vectors are stored in, and scored from, an inverted list.
pub trait ListCodec: Send + Sync {
    /// Element type of a stored code.
    type Code: Copy + Default + Send + Sync + std::fmt::Debug;

    /// Per-query state precomputed from the (residual) query, reused across
    /// every code it is scored against.
    type Table: Send;

    /// Dimension of the vectors this codec encodes.
    fn dimension(&self) -> usize;

    /// Number of `Code` elements per stored vector.
    fn code_len(&self) -> usize;

    /// Whether lists store `vector - centroid` rather than the vector itself.
    fn by_residual(&self) -> bool {
        true
    }

    /// Encode one vector (or residual) into `out` (`code_len` elements).
    fn encode_into(&self, input: &[f32], out: &mut [Self::Code]);

    /// Allocate an empty table; filled by [`ListCodec::prepare_into`].
    fn new_table(&self) -> Self::Table;

    /// Precompute scoring state for `query` (already residual if `by_residual`).
    fn prepare_into(&self, query: &[f32], table: &mut Self::Table);

    /// Approximate squared distance between the prepared query and `code`.
    fn score(&self, table: &Self::Table, code: &[Self::Code]) -> f32;
}
