//! Scalar quantization: compress vectors one dimension at a time.
//!
//! # Scalar vs Vector Quantization
//!
//! **Scalar quantization** (this module): quantize each dimension
//! independently against a learned `[min, max]` range (or to half
//! precision). No codebooks, cheap training, 2x to 8x compression.
//!
//! **Vector quantization** (see [`crate::ivf_pq`]): learn codebooks that
//! capture multi-dimensional structure. Better compression at equal
//! accuracy, more expensive to train.
//!
//! ```text
//! Original:  [0.12, -0.70, 0.35]          range per dim: [-1, 1]
//!    ↓ t = (x - min) / (max - min), round(t · 255)
//! Codes:     [143, 38, 172]               (QT_8bit: 1 byte per dim)
//! ```
//!
//! Distances are asymmetric: the query stays exact and each code is decoded
//! component by component while accumulating squared differences.
//!
//! Two indexes use it:
//!
//! - [`SQIndex`]: every code scanned per query.
//! - [`IVFSQIndex`]: codes of residuals in inverted lists, `n_probe` lists
//!   scanned per query.

pub mod index;
pub mod sq;

pub use index::{IVFSQIndex, IVFSQParams, SQIndex, SQParams};
pub use sq::{QuantizerType, ScalarQuantizer};
