//! LSH (Locality Sensitive Hashing) implementation.
//!
//! Random Projection LSH: each bit records on which side of a random
//! hyperplane a vector falls. Nearby vectors (small angle) agree on most
//! bits, so Hamming distance between codes tracks angular distance.
//!
//! ```text
//! vector ──R──▶ [p₁ p₂ … p_b] ──(> t)──▶ 1 0 … 1 ──popcount(xor)──▶ Hamming
//! ```
//!
//! The index stores one code per vector and scans all of them per query.
//!
//! # References
//!
//! - Charikar (2002): "Similarity estimation techniques from rounding
//!   algorithms"
//! - Indyk & Motwani (1998): "Approximate nearest neighbors: towards removing
//!   the curse of dimensionality"

mod random_projection;
pub mod search;

pub use random_projection::{hamming, RandomProjection};
pub use search::{LSHIndex, LSHParams};
