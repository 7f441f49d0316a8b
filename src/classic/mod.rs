//! Classic hashing-based ANN methods, kept for comparison with the IVF family.

#[cfg(feature = "lsh")]
pub mod lsh;
