//! Unified Approximate Nearest Neighbor (ANN) interface over every index kind.
//!
//! - [`ANNIndex`]: the search trait all built indexes implement.
//! - [`IndexConfig`]: tagged description of which index to build.
//! - [`AnyIndex`]: a built index of any kind, dispatched in one place.
//!
//! ```rust
//! use cellprobe::ann::{ANNIndex, AnyIndex, IndexConfig};
//! use cellprobe::VectorStore;
//!
//! # fn main() -> cellprobe::Result<()> {
//! let config: IndexConfig = serde_json::from_str(r#"{"kind": "ivf_flat", "n_list": 4}"#)?;
//! let rows: Vec<Vec<f32>> = (0..64).map(|i| vec![i as f32, (i % 8) as f32]).collect();
//! let index = AnyIndex::build(&config, &VectorStore::from_rows(&rows)?)?;
//! assert_eq!(index.search(&[3.0, 3.0], 1, 4)?[0].0, 3);
//! # Ok(())
//! # }
//! ```

pub mod any;
pub mod config;
pub mod traits;

pub use any::AnyIndex;
pub use config::IndexConfig;
pub use traits::{ANNIndex, ANNStats};
