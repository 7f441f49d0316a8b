//! Error types for cellprobe.

use thiserror::Error;

/// Errors that can occur while training, building, or searching an index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnError {
    /// Bad dimension/segment split, bit width, or other construction parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Too few training vectors for the requested number of clusters.
    #[error("insufficient training data for {what}: need at least {needed} vectors, got {available}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// The index has not been fitted yet.
    #[error("not ready: {0}")]
    NotReady(&'static str),

    /// Invalid per-call argument (`n == 0`, `n_probe == 0`, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Vector dimensionality does not match the index.
    #[error("dimension mismatch: index has {expected} dimensions, vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Internal bounds violation. Never expected to reach callers of the
    /// public search API.
    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// Malformed algorithm configuration document.
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for AnnError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnnError>;
