//! Space partitioning: k-means and the IVF coarse quantizer built on it.

pub mod coarse;
pub mod kmeans;

pub use coarse::{CoarseQuantizer, ProbeList, TrainParams};
pub use kmeans::{KMeans, KMeansReport};
