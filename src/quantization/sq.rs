//! Scalar quantization: each dimension encoded independently.
//!
//! | Type | Bits/dim | Range |
//! |------|----------|-------|
//! | `QT_8bit` | 8 | per-dimension min/max |
//! | `QT_6bit` | 6 | per-dimension min/max |
//! | `QT_4bit` | 4 | per-dimension min/max |
//! | `QT_8bit_uniform` | 8 | one min/max over all dimensions |
//! | `QT_fp16` | 16 | none (IEEE half precision) |
//!
//! Codes are bit-packed little-endian: component `j` of a `b`-bit code
//! occupies bits `j*b .. (j+1)*b` of the byte string.

use std::fmt;
use std::str::FromStr;

use half::f16;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnnError, Result};
use crate::ivf::ListCodec;

/// Supported scalar quantizer types, named as in benchmark configurations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantizerType {
    #[default]
    #[serde(rename = "QT_8bit")]
    Bits8,
    #[serde(rename = "QT_6bit")]
    Bits6,
    #[serde(rename = "QT_4bit")]
    Bits4,
    #[serde(rename = "QT_8bit_uniform")]
    Bits8Uniform,
    #[serde(rename = "QT_fp16")]
    Fp16,
}

impl QuantizerType {
    pub const ALL: [QuantizerType; 5] = [
        Self::Bits8,
        Self::Bits6,
        Self::Bits4,
        Self::Bits8Uniform,
        Self::Fp16,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Bits8 => "QT_8bit",
            Self::Bits6 => "QT_6bit",
            Self::Bits4 => "QT_4bit",
            Self::Bits8Uniform => "QT_8bit_uniform",
            Self::Fp16 => "QT_fp16",
        }
    }

    /// Bits per encoded component.
    pub fn bits(self) -> usize {
        match self {
            Self::Bits8 | Self::Bits8Uniform => 8,
            Self::Bits6 => 6,
            Self::Bits4 => 4,
            Self::Fp16 => 16,
        }
    }

    /// Bytes per encoded vector of `dimension` components.
    pub fn code_len(self, dimension: usize) -> usize {
        (dimension * self.bits()).div_ceil(8)
    }

    fn is_uniform(self) -> bool {
        matches!(self, Self::Bits8Uniform)
    }

    /// Highest integer level; `None` for fp16.
    fn levels(self) -> Option<u32> {
        match self {
            Self::Fp16 => None,
            other => Some((1u32 << other.bits()) - 1),
        }
    }
}

impl fmt::Display for QuantizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuantizerType {
    type Err = AnnError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| AnnError::InvalidConfig(format!("unknown scalar quantizer type {s:?}")))
    }
}

/// A trained scalar quantizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarQuantizer {
    qtype: QuantizerType,
    dimension: usize,
    /// Per-dimension minimum (a single entry for uniform types).
    vmin: Vec<f32>,
    /// Per-dimension `max - min` (a single entry for uniform types).
    vdiff: Vec<f32>,
}

impl ScalarQuantizer {
    /// Learn value ranges from `num_vectors` rows of `vectors`.
    pub fn train(
        vectors: &[f32],
        num_vectors: usize,
        dimension: usize,
        qtype: QuantizerType,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(AnnError::InvalidConfig("dimension must be > 0".into()));
        }
        if num_vectors == 0 {
            return Err(AnnError::InsufficientData {
                what: "scalar quantizer",
                needed: 1,
                available: 0,
            });
        }
        if vectors.len() < num_vectors * dimension {
            return Err(AnnError::InvalidArgument(format!(
                "buffer holds {} values, expected {num_vectors} x {dimension}",
                vectors.len()
            )));
        }

        let mut lo = vec![f32::INFINITY; dimension];
        let mut hi = vec![f32::NEG_INFINITY; dimension];
        for row in vectors[..num_vectors * dimension].chunks_exact(dimension) {
            for ((l, h), &x) in lo.iter_mut().zip(hi.iter_mut()).zip(row) {
                *l = l.min(x);
                *h = h.max(x);
            }
        }

        let (vmin, vdiff) = if qtype.is_uniform() {
            let l = lo.iter().copied().fold(f32::INFINITY, f32::min);
            let h = hi.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            (vec![l], vec![h - l])
        } else {
            let diff = lo.iter().zip(&hi).map(|(l, h)| h - l).collect();
            (lo, diff)
        };

        info!(%qtype, dimension, n_train = num_vectors, "trained scalar quantizer");

        Ok(Self {
            qtype,
            dimension,
            vmin,
            vdiff,
        })
    }

    #[inline]
    fn range(&self, j: usize) -> (f32, f32) {
        if self.qtype.is_uniform() {
            (self.vmin[0], self.vdiff[0])
        } else {
            (self.vmin[j], self.vdiff[j])
        }
    }

    pub fn encode(&self, vector: &[f32]) -> Vec<u8> {
        let mut code = vec![0u8; self.code_len()];
        self.encode_into(vector, &mut code);
        code
    }

    /// Encode into `out` (`code_len` bytes, overwritten).
    pub fn encode_into(&self, vector: &[f32], out: &mut [u8]) {
        debug_assert_eq!(vector.len(), self.dimension);
        out.fill(0);
        match self.qtype.levels() {
            None => {
                for (&x, slot) in vector.iter().zip(out.chunks_exact_mut(2)) {
                    slot.copy_from_slice(&f16::from_f32(x).to_le_bytes());
                }
            }
            Some(levels) => {
                let bits = self.qtype.bits();
                for (j, &x) in vector.iter().enumerate() {
                    let (vmin, vdiff) = self.range(j);
                    let level = if vdiff > 0.0 {
                        let t = ((x - vmin) / vdiff).clamp(0.0, 1.0);
                        (t * levels as f32).round() as u32
                    } else {
                        0
                    };
                    put_bits(out, j, bits, level);
                }
            }
        }
    }

    /// Reconstructed value of component `j`.
    #[inline]
    fn component(&self, code: &[u8], j: usize) -> f32 {
        match self.qtype.levels() {
            None => f16::from_le_bytes([code[2 * j], code[2 * j + 1]]).to_f32(),
            Some(levels) => {
                let (vmin, vdiff) = self.range(j);
                let level = get_bits(code, j, self.qtype.bits());
                vmin + vdiff * (level as f32 / levels as f32)
            }
        }
    }

    pub fn decode(&self, code: &[u8]) -> Vec<f32> {
        (0..self.dimension).map(|j| self.component(code, j)).collect()
    }

    /// Squared L2 between an exact query and an encoded vector.
    #[inline]
    pub fn distance(&self, query: &[f32], code: &[u8]) -> f32 {
        query
            .iter()
            .enumerate()
            .map(|(j, &q)| {
                let d = q - self.component(code, j);
                d * d
            })
            .sum()
    }

    /// Largest absolute per-component reconstruction error for in-range
    /// values: half a quantization step (0 for constant dimensions).
    pub fn max_step_error(&self) -> f32 {
        match self.qtype.levels() {
            None => 0.0,
            Some(levels) => {
                self.vdiff.iter().copied().fold(0.0f32, f32::max) / (2.0 * levels as f32)
            }
        }
    }

    pub fn qtype(&self) -> QuantizerType {
        self.qtype
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn code_len(&self) -> usize {
        self.qtype.code_len(self.dimension)
    }

    pub fn size_bytes(&self) -> usize {
        (self.vmin.len() + self.vdiff.len()) * std::mem::size_of::<f32>()
    }
}

impl ListCodec for ScalarQuantizer {
    type Code = u8;
    type Table = Vec<f32>;

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn code_len(&self) -> usize {
        ScalarQuantizer::code_len(self)
    }

    fn encode_into(&self, input: &[f32], out: &mut [u8]) {
        ScalarQuantizer::encode_into(self, input, out);
    }

    fn new_table(&self) -> Vec<f32> {
        vec![0.0; self.dimension]
    }

    fn prepare_into(&self, query: &[f32], table: &mut Vec<f32>) {
        table.clear();
        table.extend_from_slice(query);
    }

    #[inline]
    fn score(&self, table: &Vec<f32>, code: &[u8]) -> f32 {
        self.distance(table, code)
    }
}

/// Write the low `bits` of `value` as component `idx` (bits <= 8).
#[inline]
fn put_bits(out: &mut [u8], idx: usize, bits: usize, value: u32) {
    let bit = idx * bits;
    let (byte, shift) = (bit / 8, bit % 8);
    let wide = (value as u16) << shift;
    out[byte] |= wide as u8;
    if shift + bits > 8 {
        out[byte + 1] |= (wide >> 8) as u8;
    }
}

#[inline]
fn get_bits(code: &[u8], idx: usize, bits: usize) -> u32 {
    let bit = idx * bits;
    let (byte, shift) = (bit / 8, bit % 8);
    let mut wide = code[byte] as u16;
    if shift + bits > 8 {
        wide |= (code[byte + 1] as u16) << 8;
    }
    ((wide >> shift) & ((1u16 << bits) - 1)) as u32
}
