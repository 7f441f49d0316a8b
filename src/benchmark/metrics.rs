//! Retrieval-quality metrics.
//!
//! - Recall@k: fraction of the true k nearest neighbors that were returned
//! - Precision@k: fraction of returned items that are true neighbors

use std::collections::HashSet;

/// `|retrieved[..k] ∩ ground_truth[..k]| / k`, in `[0, 1]`.
///
/// A short `retrieved` list is not penalized beyond the ids it misses.
pub fn recall_at_k(ground_truth: &[u32], retrieved: &[u32], k: usize) -> f32 {
    if k == 0 || ground_truth.is_empty() {
        return 0.0;
    }
    let k = k.min(ground_truth.len());
    let truth: HashSet<u32> = ground_truth.iter().take(k).copied().collect();
    let found = retrieved
        .iter()
        .take(k)
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|id| truth.contains(id))
        .count();
    found as f32 / k as f32
}

/// `|retrieved[..k] ∩ ground_truth[..k]| / |retrieved[..k]|`.
pub fn precision_at_k(ground_truth: &[u32], retrieved: &[u32], k: usize) -> f32 {
    let retrieved = &retrieved[..retrieved.len().min(k)];
    if retrieved.is_empty() {
        return 0.0;
    }
    let truth: HashSet<u32> = ground_truth.iter().take(k).copied().collect();
    let hits = retrieved.iter().filter(|id| truth.contains(id)).count();
    hits as f32 / retrieved.len() as f32
}

/// Recall@k averaged over queries.
pub fn mean_recall(ground_truths: &[Vec<u32>], retrievals: &[Vec<u32>], k: usize) -> f32 {
    if ground_truths.is_empty() {
        return 0.0;
    }
    let total: f32 = ground_truths
        .iter()
        .zip(retrievals)
        .map(|(gt, ret)| recall_at_k(gt, ret, k))
        .sum();
    total / ground_truths.len() as f32
}

/// Fraction of queries whose first result is the true nearest neighbor.
pub fn top1_agreement(ground_truths: &[Vec<u32>], retrievals: &[Vec<u32>]) -> f32 {
    if ground_truths.is_empty() {
        return 0.0;
    }
    let agree = ground_truths
        .iter()
        .zip(retrievals)
        .filter(|(gt, ret)| gt.first().is_some() && gt.first() == ret.first())
        .count();
    agree as f32 / ground_truths.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall() {
        let gt = vec![1, 2, 3, 4, 5];
        assert!((recall_at_k(&gt, &[1, 2, 3, 6, 7], 5) - 0.6).abs() < 1e-6);
        assert_eq!(recall_at_k(&gt, &gt, 5), 1.0);
        assert_eq!(recall_at_k(&gt, &[6, 7, 8, 9, 10], 5), 0.0);
        assert!((recall_at_k(&gt, &[1], 5) - 0.2).abs() < 1e-6);
        assert_eq!(recall_at_k(&gt, &[1, 2], 0), 0.0);
    }

    #[test]
    fn duplicate_ids_count_once() {
        assert!((recall_at_k(&[1, 2], &[1, 1], 2) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn precision() {
        let gt = vec![1, 2, 3, 4, 5];
        assert!((precision_at_k(&gt, &[1, 2, 6, 7, 8], 5) - 0.4).abs() < 1e-6);
        assert_eq!(precision_at_k(&gt, &[1], 5), 1.0);
        assert_eq!(precision_at_k(&gt, &[], 5), 0.0);
    }

    #[test]
    fn aggregates() {
        let gts = vec![vec![1, 2], vec![3, 4]];
        let rets = vec![vec![1, 2], vec![4, 9]];
        assert!((mean_recall(&gts, &rets, 2) - 0.75).abs() < 1e-6);
        assert!((top1_agreement(&gts, &rets) - 0.5).abs() < 1e-6);
    }
}
