//! End-to-end recall and partition checks for the IVF indexes.
//!
//! Slow-ish: k-means and PQ training run on a few thousand vectors.

use std::collections::HashSet;

use cellprobe::benchmark::{gaussian_clusters, ground_truth, mean_recall, top1_agreement, uniform_dataset};
use cellprobe::{IVFFlatIndex, IVFFlatParams, IVFPQIndex, IVFPQParams, VectorStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Queries that are perturbed copies of stored vectors, so the true nearest
/// neighbor is well separated from the rest.
fn near_duplicate_queries(train: &[Vec<f32>], n: usize, noise: f32, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let base = &train[rng.random_range(0..train.len())];
            base.iter()
                .map(|&x| x + noise * (rng.random::<f32>() - 0.5))
                .collect()
        })
        .collect()
}

fn pq_params(n_list: usize) -> IVFPQParams {
    IVFPQParams {
        n_list,
        m: 8,
        n_bits: 8,
        ..Default::default()
    }
}

#[test]
fn every_id_lands_in_exactly_one_list() {
    let data = gaussian_clusters(3000, 0, 16, 12, 0.1, 1);
    let store = VectorStore::from_rows(&data.train).unwrap();
    let index = IVFPQIndex::build(
        &store,
        &IVFPQParams {
            n_list: 16,
            m: 4,
            n_bits: 6,
            ..Default::default()
        },
    )
    .unwrap();

    let lists = index.ivf().lists();
    let mut seen = vec![0usize; store.len()];
    for cell in 0..lists.n_lists() {
        let list = lists.list_for(cell).unwrap();
        assert!(list.ids().windows(2).all(|w| w[0] < w[1]), "list {cell} not sorted");
        for &id in list.ids() {
            seen[id as usize] += 1;
        }
    }
    assert!(seen.iter().all(|&c| c == 1));
    assert_eq!(lists.total_len(), store.len());
}

#[test]
fn full_probe_agrees_with_brute_force_on_top1() {
    let data = gaussian_clusters(4000, 0, 32, 20, 0.1, 7);
    let queries = near_duplicate_queries(&data.train, 200, 0.01, 8);
    let truth = ground_truth(&data.train, &queries, 1);

    let store = VectorStore::from_rows(&data.train).unwrap();
    let index = IVFPQIndex::build(&store, &pq_params(20)).unwrap();

    let found: Vec<Vec<u32>> = queries
        .iter()
        .map(|q| {
            index
                .search(q, 1, index.n_list())
                .unwrap()
                .into_iter()
                .map(|(id, _)| id)
                .collect()
        })
        .collect();

    let agreement = top1_agreement(&truth, &found);
    assert!(agreement >= 0.95, "top-1 agreement {agreement}");
}

#[test]
fn ivf_flat_recall_is_monotone_in_n_probe() {
    let data = gaussian_clusters(3000, 100, 16, 10, 0.2, 11);
    let truth = data.ground_truth(10);
    let store = VectorStore::from_rows(&data.train).unwrap();
    let n_list = 16;
    let index = IVFFlatIndex::build(
        &store,
        &IVFFlatParams {
            n_list,
            ..Default::default()
        },
    )
    .unwrap();

    let mut last = 0.0f32;
    for n_probe in [1, 2, 4, n_list] {
        let found: Vec<Vec<u32>> = data
            .test
            .iter()
            .map(|q| {
                index
                    .search(q, 10, n_probe)
                    .unwrap()
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect()
            })
            .collect();
        let recall = mean_recall(&truth, &found, 10);
        assert!(recall >= last, "recall fell from {last} to {recall} at n_probe={n_probe}");
        last = recall;
    }
    // Exhaustive probing with raw vectors is exact.
    assert!((last - 1.0).abs() < 1e-6);
}

#[test]
fn ivf_pq_kth_distance_never_grows_with_n_probe() {
    let data = gaussian_clusters(3000, 50, 16, 10, 0.2, 13);
    let store = VectorStore::from_rows(&data.train).unwrap();
    let index = IVFPQIndex::build(
        &store,
        &IVFPQParams {
            n_list: 16,
            m: 4,
            n_bits: 6,
            ..Default::default()
        },
    )
    .unwrap();
    let truth = data.ground_truth(10);

    let mut recalls = Vec::new();
    for q in &data.test {
        let mut last_kth = f32::INFINITY;
        for n_probe in [1, 2, 4, 16] {
            let hits = index.search(q, 10, n_probe).unwrap();
            if hits.len() == 10 {
                let kth = hits[9].1;
                assert!(kth <= last_kth, "k-th distance grew at n_probe={n_probe}");
                last_kth = kth;
            }
        }
    }
    for n_probe in [1, 2, 4, 16] {
        let found: Vec<Vec<u32>> = data
            .test
            .iter()
            .map(|q| index.search(q, 10, n_probe).unwrap().into_iter().map(|(id, _)| id).collect())
            .collect();
        recalls.push(mean_recall(&truth, &found, 10));
    }
    assert!(recalls.windows(2).all(|w| w[1] + 0.02 >= w[0]), "{recalls:?}");
    assert!(recalls[3] > recalls[0]);
}

#[test]
fn results_are_bounded_unique_and_known() {
    let data = gaussian_clusters(1500, 30, 8, 6, 0.3, 17);
    let store = VectorStore::from_rows(&data.train).unwrap();
    let index = IVFPQIndex::build(
        &store,
        &IVFPQParams {
            n_list: 8,
            m: 4,
            n_bits: 5,
            ..Default::default()
        },
    )
    .unwrap();

    for q in &data.test {
        for n in [1, 7, 50] {
            let hits = index.search(q, n, 3).unwrap();
            assert!(hits.len() <= n);
            let ids: HashSet<u32> = hits.iter().map(|&(id, _)| id).collect();
            assert_eq!(ids.len(), hits.len());
            assert!(ids.iter().all(|&id| (id as usize) < store.len()));
            assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
        }
    }
}

#[test]
fn stored_vector_finds_itself_in_random_64d() {
    let data = uniform_dataset(10_000, 0, 64, 2024);
    let store = VectorStore::from_rows(&data.train).unwrap();
    let index = IVFPQIndex::build(&store, &pq_params(100)).unwrap();
    assert_eq!(index.num_vectors(), 10_000);

    let probes: Vec<usize> = (0..50).map(|i| i * 197).collect();
    let mut found_self = 0;
    for &i in &probes {
        let hits = index.search(&data.train[i], 1, index.n_list()).unwrap();
        assert_eq!(hits.len(), 1);
        if hits[0].0 == i as u32 {
            found_self += 1;
            // Bounded by quantization error, well below the typical
            // squared distance between two uniform points (d / 6).
            assert!(hits[0].1 < 64.0 / 6.0 / 2.0, "self distance {}", hits[0].1);
        }
    }
    assert!(found_self >= 48, "found itself {found_self}/50 times");
}
