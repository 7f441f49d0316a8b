//! Benchmark utilities: synthetic datasets, exact ground truth, recall.
//!
//! Used by the integration tests and criterion benches to check the
//! recall / work trade-off of the IVF kinds.
//!
//! # Standard Benchmark Datasets
//!
//! | Dataset | Size | Dim | Distance |
//! |---------|------|-----|----------|
//! | SIFT-1M | 1M | 128 | L2 |
//! | GloVe-100 | 1.2M | 100 | Angular |
//! | Fashion-MNIST | 60K | 784 | L2 |
//!
//! Those are loaded by the harness itself; here we only synthesize data with
//! similar shape for tests.

pub mod datasets;
pub mod metrics;

pub use datasets::{exact_knn, gaussian_clusters, ground_truth, uniform_dataset, Dataset};
pub use metrics::{mean_recall, precision_at_k, recall_at_k, top1_agreement};
