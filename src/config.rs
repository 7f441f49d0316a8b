//! Algorithm definitions as loaded from benchmark configuration.

use serde::{Deserialize, Serialize};

use crate::ann::IndexConfig;
use crate::distance::Metric;
use crate::error::{AnnError, Result};

/// One algorithm instance: metric, index kind, and run settings.
///
/// ```json
/// {
///   "metric": "angular",
///   "index": {"kind": "ivf_pq", "n_list": 100, "m": 8},
///   "query_args": [1, 5, 10, 50],
///   "threads": 4
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    #[serde(default)]
    pub metric: Metric,
    pub index: IndexConfig,
    /// `n_probe` values to sweep; the first is applied after construction.
    #[serde(default)]
    pub query_args: Vec<usize>,
    /// Size of a dedicated worker pool for builds and batch queries; the
    /// global rayon pool is used when absent.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl AlgorithmConfig {
    pub fn new(metric: Metric, index: IndexConfig) -> Self {
        Self {
            metric,
            index,
            query_args: Vec::new(),
            threads: None,
        }
    }

    /// Parse and validate a JSON definition.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that need no data: zero-valued knobs and thread counts.
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(AnnError::Config("threads must be > 0".into()));
        }
        if self.query_args.contains(&0) {
            return Err(AnnError::Config("query_args must all be > 0".into()));
        }
        if self.index.n_list() == Some(0) {
            return Err(AnnError::Config("n_list must be > 0".into()));
        }
        Ok(())
    }
}
