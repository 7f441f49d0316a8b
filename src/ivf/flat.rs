//! IVF-Flat: lists hold the raw vectors, candidates are scored exactly.

use serde::{Deserialize, Serialize};

use super::index::IVFIndex;
use super::ListCodec;
use crate::distance::l2_squared;
use crate::error::Result;
use crate::partitioning::TrainParams;
use crate::store::VectorStore;

/// Identity codec: stores vectors as-is (not residuals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatCodec {
    dimension: usize,
}

impl FlatCodec {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl ListCodec for FlatCodec {
    type Code = f32;
    type Table = Vec<f32>;

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn code_len(&self) -> usize {
        self.dimension
    }

    fn by_residual(&self) -> bool {
        false
    }

    fn encode_into(&self, input: &[f32], out: &mut [f32]) {
        out.copy_from_slice(input);
    }

    fn new_table(&self) -> Vec<f32> {
        vec![0.0; self.dimension]
    }

    fn prepare_into(&self, query: &[f32], table: &mut Vec<f32>) {
        table.clear();
        table.extend_from_slice(query);
    }

    #[inline]
    fn score(&self, table: &Vec<f32>, code: &[f32]) -> f32 {
        l2_squared(table, code)
    }
}

/// IVF-Flat parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IVFFlatParams {
    /// Number of coarse cells.
    pub n_list: usize,
    #[serde(default)]
    pub train: TrainParams,
}

impl Default for IVFFlatParams {
    fn default() -> Self {
        Self {
            n_list: 100,
            train: TrainParams::default(),
        }
    }
}

pub type IVFFlatIndex = IVFIndex<FlatCodec>;

impl IVFIndex<FlatCodec> {
    /// Train the coarse quantizer and store every vector in its cell.
    pub fn build(store: &VectorStore, params: &IVFFlatParams) -> Result<Self> {
        let dimension = store.dimension();
        Self::build_with(store, params.n_list, &params.train, |_, _| {
            Ok(FlatCodec::new(dimension))
        })
    }
}
