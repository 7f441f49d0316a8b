//! Benchmark-harness adapter: the `fit` / `query` / `batch_query` protocol
//! over any index kind.
//!
//! ```rust
//! use cellprobe::{Algorithm, Metric};
//!
//! # fn main() -> cellprobe::Result<()> {
//! let mut algo = Algorithm::ivf(Metric::Euclidean, 4);
//! let data: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64, (i % 10) as f64]).collect();
//! algo.fit(&data)?;
//! algo.set_query_arguments(4)?;
//!
//! assert_eq!(algo.query(&[42.0, 2.0], 1)?, vec![42]);
//! assert_eq!(algo.to_string(), "IVF(n_list=4, n_probe=4)");
//!
//! algo.batch_query(&[vec![1.0f32, 1.0], vec![99.0, 9.0]], 2)?;
//! let batch = algo.get_batch_results()?;
//! assert_eq!(batch[1][0], 99);
//! # Ok(())
//! # }
//! ```

mod batch;

pub use batch::BatchHandle;

use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ann::{ANNIndex, AnyIndex, IndexConfig};
use crate::config::AlgorithmConfig;
use crate::distance::Metric;
use crate::error::{AnnError, Result};
use crate::ivf::IVFFlatParams;
use crate::ivf_pq::IVFPQParams;
use crate::store::VectorStore;
use crate::topk::SearchStats;

/// Extra per-run measurements reported next to recall and timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdditionalInfo {
    /// Distance computations since the last `set_query_arguments`, including
    /// one query-to-centroid comparison per cell per query for IVF kinds.
    pub dist_comps: usize,
}

/// An algorithm instance as driven by a benchmark harness.
pub struct Algorithm {
    config: AlgorithmConfig,
    index: Option<AnyIndex>,
    n_probe: usize,
    counters: SearchStats,
    pending: Option<BatchHandle>,
    pool: Option<rayon::ThreadPool>,
}

impl Algorithm {
    /// Build from a parsed definition. The first `query_args` entry, if
    /// any, becomes the initial `n_probe`.
    pub fn new(config: AlgorithmConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("cellprobe-{i}"))
                    .build()
                    .map_err(|e| AnnError::Config(e.to_string()))?,
            ),
            None => None,
        };
        let n_probe = config.query_args.first().copied().unwrap_or(1);
        Ok(Self {
            config,
            index: None,
            n_probe,
            counters: SearchStats::default(),
            pending: None,
            pool,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(AlgorithmConfig::from_json(json)?)
    }

    /// Single-config constructor on the global pool.
    pub fn with_index(metric: Metric, index: IndexConfig) -> Self {
        Self {
            config: AlgorithmConfig::new(metric, index),
            index: None,
            n_probe: 1,
            counters: SearchStats::default(),
            pending: None,
            pool: None,
        }
    }

    #[cfg(feature = "lsh")]
    pub fn lsh(metric: Metric, n_bits: usize) -> Self {
        Self::with_index(
            metric,
            IndexConfig::Lsh(crate::classic::lsh::LSHParams {
                n_bits,
                ..Default::default()
            }),
        )
    }

    pub fn ivf(metric: Metric, n_list: usize) -> Self {
        Self::with_index(
            metric,
            IndexConfig::IvfFlat(IVFFlatParams {
                n_list,
                ..Default::default()
            }),
        )
    }

    pub fn ivf_pq(metric: Metric, n_list: usize, m: usize, n_bits: usize) -> Self {
        Self::with_index(
            metric,
            IndexConfig::IvfPq(IVFPQParams {
                n_list,
                m,
                n_bits,
                ..Default::default()
            }),
        )
    }

    pub fn ivf_pq_rotated(metric: Metric, n_list: usize, m: usize, n_bits: usize) -> Self {
        Self::with_index(
            metric,
            IndexConfig::IvfPqRotated(IVFPQParams {
                n_list,
                m,
                n_bits,
                ..Default::default()
            }),
        )
    }

    #[cfg(feature = "sq")]
    pub fn ivf_sq(metric: Metric, n_centroids: usize, qtype: crate::quantization::QuantizerType) -> Self {
        Self::with_index(
            metric,
            IndexConfig::IvfSq(crate::quantization::IVFSQParams {
                n_list: n_centroids,
                qtype,
                ..Default::default()
            }),
        )
    }

    #[cfg(feature = "sq")]
    pub fn sq(metric: Metric, qtype: crate::quantization::QuantizerType) -> Self {
        Self::with_index(
            metric,
            IndexConfig::Sq(crate::quantization::SQParams { qtype }),
        )
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Load `rows` (any float type) and build the configured index.
    ///
    /// Ragged rows are rejected; an empty dataset yields an empty, queryable
    /// index.
    pub fn fit<R, T>(&mut self, rows: &[R]) -> Result<()>
    where
        R: AsRef<[T]>,
        T: Copy + Into<f64>,
    {
        self.fit_store(VectorStore::from_rows(rows)?)
    }

    /// Build from an already loaded store.
    pub fn fit_store(&mut self, mut store: VectorStore) -> Result<()> {
        store.prepare(self.config.metric);
        let config = &self.config.index;
        let index = self.install(|| AnyIndex::build(config, &store))?;

        info!(
            algorithm = %self.config.index.display_name(self.n_probe),
            metric = %self.config.metric,
            n = store.len(),
            dimension = store.dimension(),
            bytes = index.size_bytes(),
            "fit complete"
        );
        self.index = Some(index);
        self.pending = None;
        self.counters = SearchStats::default();
        Ok(())
    }

    fn index(&self) -> Result<&AnyIndex> {
        self.index
            .as_ref()
            .ok_or(AnnError::NotReady("query before fit"))
    }

    /// Set `n_probe` for subsequent queries and reset the distance counter.
    ///
    /// Values above `n_list` are accepted and probe every cell.
    pub fn set_query_arguments(&mut self, n_probe: usize) -> Result<()> {
        if n_probe == 0 {
            return Err(AnnError::InvalidArgument("n_probe must be > 0".into()));
        }
        if let Some(n_list) = self.index.as_ref().and_then(|i| i.n_list()) {
            if n_probe > n_list {
                warn!(n_probe, n_list, "n_probe exceeds n_list, every cell will be probed");
            }
        }
        self.n_probe = n_probe;
        self.counters = SearchStats::default();
        Ok(())
    }

    pub fn n_probe(&self) -> usize {
        self.n_probe
    }

    fn prepared(&self, query: &[f32]) -> Vec<f32> {
        let mut q = query.to_vec();
        self.config.metric.prepare(&mut q);
        q
    }

    /// Ids of the (up to) `n` nearest neighbors of `query`.
    pub fn query(&mut self, query: &[f32], n: usize) -> Result<Vec<u32>> {
        Ok(self
            .query_with_distances(query, n)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// [`Self::query`] with the index's distances.
    pub fn query_with_distances(&mut self, query: &[f32], n: usize) -> Result<Vec<(u32, f32)>> {
        let index = self.index()?;
        let q = self.prepared(query);
        let (hits, stats) = index.search_with_stats(&q, n, self.n_probe)?;
        self.counters += stats;
        Ok(hits)
    }

    /// Run every query in parallel and return the buffered results.
    ///
    /// Counters are not touched; [`Self::batch_query`] records them.
    pub fn submit_batch<R>(&self, queries: &[R], n: usize) -> Result<BatchHandle>
    where
        R: AsRef<[f32]> + Sync,
    {
        let index = self.index()?;
        if n == 0 {
            return Err(AnnError::InvalidArgument("n must be > 0".into()));
        }
        let n_probe = self.n_probe;
        let results: Vec<(Vec<(u32, f32)>, SearchStats)> = self.install(|| {
            queries
                .par_iter()
                .map(|q| index.search_with_stats(&self.prepared(q.as_ref()), n, n_probe))
                .collect::<Result<_>>()
        })?;

        let mut stats = SearchStats::default();
        let hits = results
            .into_iter()
            .map(|(h, s)| {
                stats += s;
                h
            })
            .collect();
        debug!(queries = queries.len(), n, n_probe, "batch complete");
        Ok(BatchHandle::from_hits(n, hits, stats))
    }

    /// Issue a batch; fetch its results with [`Self::get_batch_results`].
    pub fn batch_query<R>(&mut self, queries: &[R], n: usize) -> Result<()>
    where
        R: AsRef<[f32]> + Sync,
    {
        let handle = self.submit_batch(queries, n)?;
        self.counters += handle.stats();
        self.pending = Some(handle);
        Ok(())
    }

    /// Results of the last [`Self::batch_query`], padding removed.
    pub fn get_batch_results(&mut self) -> Result<Vec<Vec<u32>>> {
        self.pending
            .take()
            .map(BatchHandle::resolve)
            .ok_or(AnnError::NotReady("no batch query has been issued"))
    }

    pub fn additional(&self) -> AdditionalInfo {
        AdditionalInfo {
            dist_comps: self.counters.total_distance_computations(),
        }
    }

    /// Work counters since the last `set_query_arguments` (or fit).
    pub fn counters(&self) -> SearchStats {
        self.counters
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn metric(&self) -> Metric {
        self.config.metric
    }

    /// The built index, once fitted.
    pub fn built_index(&self) -> Option<&AnyIndex> {
        self.index.as_ref()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.config.index.display_name(self.n_probe))
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm")
            .field("name", &self.to_string())
            .field("metric", &self.config.metric)
            .field("fitted", &self.index.is_some())
            .field("counters", &self.counters)
            .finish()
    }
}
