//! Bounded top-k aggregation shared by every search path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::AddAssign;

/// Candidate ordered by `(distance, id)`; the heap top is the current worst.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    id: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

/// Max-heap holding the `k` best `(id, distance)` pairs seen so far.
///
/// Equal distances are resolved in favour of the lower id, so the result is
/// independent of the order candidates arrive in.
#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1 << 16)),
        }
    }

    /// Offer a candidate.
    #[inline]
    pub fn push(&mut self, id: u32, distance: f32) {
        if self.k == 0 {
            return;
        }
        let candidate = Candidate { distance, id };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if candidate < *worst {
                *worst = candidate;
            }
        }
    }

    /// Worst retained distance once full, `+inf` before that.
    #[inline]
    pub fn threshold(&self) -> f32 {
        if self.heap.len() < self.k {
            f32::INFINITY
        } else {
            self.heap.peek().map_or(f32::INFINITY, |c| c.distance)
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Results in ascending `(distance, id)` order.
    pub fn into_sorted_vec(self) -> Vec<(u32, f32)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (c.id, c.distance))
            .collect()
    }
}

/// Work counters for a single query, returned next to its results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Inverted lists (or hash buckets) actually scanned.
    pub lists_probed: usize,
    /// Query-to-centroid distances computed by the coarse probe.
    pub coarse_distance_computations: usize,
    /// Query-to-candidate distances (table lookups, SQ or Hamming scores).
    pub distance_computations: usize,
}

impl SearchStats {
    /// Every distance evaluated for the query.
    pub fn total_distance_computations(&self) -> usize {
        self.coarse_distance_computations + self.distance_computations
    }
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.lists_probed += rhs.lists_probed;
        self.coarse_distance_computations += rhs.coarse_distance_computations;
        self.distance_computations += rhs.distance_computations;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_k_smallest_in_order() {
        let mut top = TopK::new(3);
        for (id, d) in [(0, 5.0), (1, 1.0), (2, 4.0), (3, 0.5), (4, 9.0)] {
            top.push(id, d);
        }
        assert_eq!(top.into_sorted_vec(), vec![(3, 0.5), (1, 1.0), (2, 4.0)]);
    }

    #[test]
    fn ties_prefer_lowest_id_regardless_of_arrival() {
        let mut a = TopK::new(2);
        let mut b = TopK::new(2);
        for id in [7u32, 3, 5, 1] {
            a.push(id, 1.0);
        }
        for id in [1u32, 5, 3, 7] {
            b.push(id, 1.0);
        }
        assert_eq!(a.into_sorted_vec(), vec![(1, 1.0), (3, 1.0)]);
        assert_eq!(b.into_sorted_vec(), vec![(1, 1.0), (3, 1.0)]);
    }

    #[test]
    fn fewer_candidates_than_k() {
        let mut top = TopK::new(10);
        top.push(4, 2.0);
        assert!(top.threshold().is_infinite());
        assert_eq!(top.into_sorted_vec(), vec![(4, 2.0)]);
    }

    #[test]
    fn stats_accumulate() {
        let mut total = SearchStats::default();
        total += SearchStats {
            lists_probed: 2,
            coarse_distance_computations: 10,
            distance_computations: 40,
        };
        total += SearchStats {
            lists_probed: 1,
            coarse_distance_computations: 10,
            distance_computations: 5,
        };
        assert_eq!(total.lists_probed, 3);
        assert_eq!(total.total_distance_computations(), 65);
    }
}
