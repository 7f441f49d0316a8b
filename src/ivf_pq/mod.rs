//! IVF-PQ: Inverted File with Product Quantization.
//!
//! Combines two ideas:
//!
//! 1. **IVF (Inverted File)**: partition space into Voronoi cells, only search
//!    cells near the query (see [`crate::ivf`]).
//! 2. **PQ (Product Quantization)**: compress each vector's residual to its
//!    cell centroid into `m` bytes while preserving distance estimation.
//!
//! ## Why residuals?
//!
//! Within a cell, `x - c` is much smaller than `x`, so the same codebooks
//! describe it with far less error. The query residual changes per cell,
//! hence one distance table per probed cell.
//!
//! ## Product Quantization
//!
//! Split the vector into `m` subvectors. Quantize each independently using a
//! small codebook (`2^n_bits` entries, 256 by default). Store only the
//! codebook indices.
//!
//! ```text
//! Residual:  [r₁ r₂ r₃ r₄ ... r₁₂₈]  (128 floats = 512 bytes)
//!            └──┴──┘ └──┴──┘ ... └──┘
//!              ↓       ↓         ↓
//!            [c₁]    [c₂]  ... [cₘ]   (m=8 codebook indices = 8 bytes)
//! ```
//!
//! ## Asymmetric Distance Computation (ADC)
//!
//! Don't compress the query, only the database vectors.
//!
//! ```text
//! query residual (exact) → m × 2^n_bits table → lookup for each DB vector
//!
//! d(query, db)² ≈ Σᵢ table[i][db_code[i]]
//! ```
//!
//! ## OPQ
//!
//! PQ assumes subspaces are independent. [`OpqMatrix`] learns an orthogonal
//! rotation applied to vectors and queries before anything else; with
//! `use_opq` the index becomes the rotated variant (`OIVFPQ`).
//!
//! ## Usage
//!
//! ```rust
//! use cellprobe::ivf_pq::{IVFPQIndex, IVFPQParams};
//! use cellprobe::VectorStore;
//!
//! # fn main() -> cellprobe::Result<()> {
//! let rows: Vec<Vec<f32>> = (0..512)
//!     .map(|i| (0..8).map(|j| ((i * 7 + j * 3) % 17) as f32).collect())
//!     .collect();
//! let store = VectorStore::from_rows(&rows)?;
//!
//! let params = IVFPQParams { n_list: 4, m: 4, n_bits: 4, ..Default::default() };
//! let index = IVFPQIndex::build(&store, &params)?;
//!
//! let results = index.search(store.get(0), 10, 2)?;
//! assert!(results.len() <= 10);
//! # Ok(())
//! # }
//! ```
//!
//! ## Trade-offs
//!
//! | Parameter | ↑ Effect |
//! |-----------|----------|
//! | n_probe | Better recall, slower search |
//! | n_list | Better partitioning, slower training |
//! | m | More memory, better accuracy |
//! | n_bits | Larger tables, better accuracy |
//!
//! ## References
//!
//! - Jégou, Douze, Schmid (2011). "Product Quantization for Nearest Neighbor Search."
//! - Ge et al. (2014). "Optimized Product Quantization."

pub mod opq;
pub mod pq;
pub mod search;

pub use opq::OpqMatrix;
pub use pq::{DistanceTable, ProductQuantizer};
pub use search::{IVFPQIndex, IVFPQParams};
