//! Buffered batch results.

use crate::topk::SearchStats;

/// Results of a submitted batch, held until resolved.
///
/// Rows are fixed-width (`n` slots); queries with fewer than `n` candidates
/// are padded with `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchHandle {
    width: usize,
    rows: Vec<Vec<Option<u32>>>,
    stats: SearchStats,
}

impl BatchHandle {
    pub(crate) fn from_hits(width: usize, hits: Vec<Vec<(u32, f32)>>, stats: SearchStats) -> Self {
        let rows = hits
            .into_iter()
            .map(|row| {
                let mut padded: Vec<Option<u32>> = row.into_iter().map(|(id, _)| Some(id)).collect();
                padded.resize(width, None);
                padded
            })
            .collect();
        Self { width, rows, stats }
    }

    /// Number of queries in the batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Slots per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The padded matrix.
    pub fn rows(&self) -> &[Vec<Option<u32>>] {
        &self.rows
    }

    /// Work summed over every query of the batch.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Ids per query with the padding removed.
    pub fn resolve(self) -> Vec<Vec<u32>> {
        self.rows
            .into_iter()
            .map(|row| row.into_iter().flatten().collect())
            .collect()
    }
}
