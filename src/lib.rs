//! cellprobe: inverted-file ANN indexes behind a benchmark-harness adapter.
//!
//! The core is an IVF-PQ index: a coarse k-means quantizer partitions the
//! space into `n_list` cells, every vector is stored in its cell as a product-
//! quantized residual, and a query scans only the `n_probe` closest cells
//! with asymmetric distance tables. Around it sit the sibling kinds that
//! share the same probe engine or the same scoring contract:
//!
//! - `ivf/`: the generic inverted-file engine and IVF-Flat
//! - `ivf_pq/`: product quantization, OPQ rotation, IVF-PQ
//! - `quantization/`: scalar quantizers, IVF-SQ and flat SQ (feature `sq`)
//! - `classic/lsh`: random-projection LSH with a Hamming scan (feature `lsh`)
//! - `partitioning/`: k-means and the coarse quantizer
//! - `harness/`: the `fit` / `set_query_arguments` / `query` /
//!   `batch_query` adapter a benchmark runner drives
//!
//! # Recall vs work
//!
//! `n_probe` is the only query-time knob for IVF kinds. Each probed cell
//! costs one scan of its list; the coarse step always compares the query
//! against all `n_list` centroids. With `n_probe = n_list` IVF-Flat is exact
//! and IVF-PQ is limited only by quantization error.
//!
//! ```rust
//! use cellprobe::{Algorithm, AlgorithmConfig};
//!
//! # fn main() -> cellprobe::Result<()> {
//! let config = AlgorithmConfig::from_json(
//!     r#"{"metric": "euclidean", "index": {"kind": "ivf_pq", "n_list": 4, "m": 2, "n_bits": 4}}"#,
//! )?;
//! let mut algo = Algorithm::new(config)?;
//!
//! let data: Vec<Vec<f32>> = (0..500)
//!     .map(|i| vec![(i % 25) as f32, (i / 25) as f32, (i % 7) as f32, (i % 3) as f32])
//!     .collect();
//! algo.fit(&data)?;
//! algo.set_query_arguments(4)?;
//!
//! let hits = algo.query(&[3.0, 4.0, 2.0, 1.0], 10)?;
//! assert_eq!(hits.len(), 10);
//! assert!(algo.additional().dist_comps >= 4);
//! # Ok(())
//! # }
//! ```

pub mod ann;
pub mod benchmark;
pub mod classic;
pub mod config;
pub mod distance;
pub mod error;
pub mod harness;
pub mod ivf;
pub mod ivf_pq;
pub mod partitioning;
#[cfg(feature = "sq")]
pub mod quantization;
pub mod store;
pub mod topk;

mod linalg;

pub use ann::{ANNIndex, ANNStats, AnyIndex, IndexConfig};
pub use config::AlgorithmConfig;
pub use distance::Metric;
pub use error::{AnnError, Result};
pub use harness::{AdditionalInfo, Algorithm, BatchHandle};
pub use ivf::{IVFFlatIndex, IVFFlatParams};
pub use ivf_pq::{IVFPQIndex, IVFPQParams};
pub use partitioning::TrainParams;
pub use store::VectorStore;
pub use topk::SearchStats;
