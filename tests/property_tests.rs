//! Property-based tests for cellprobe.
//!
//! These hold regardless of input:
//! - The bounded heap keeps exactly the k best candidates
//! - Exhaustive IVF-Flat probing is exact search
//! - Search results are short, unique, sorted, and refer to stored ids
//! - Scalar quantization error is at most half a step per component

use proptest::prelude::*;

use cellprobe::benchmark::exact_knn;
use cellprobe::topk::TopK;
use cellprobe::{IVFFlatIndex, IVFFlatParams, IVFPQIndex, IVFPQParams, VectorStore};

prop_compose! {
    fn arb_rows(dim: usize, min: usize, max: usize)
        (rows in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, dim), min..max))
        -> Vec<Vec<f32>>
    {
        rows
    }
}

mod topk_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn keeps_the_k_smallest(
            dists in prop::collection::vec(0.0f32..100.0, 0..200),
            k in 1usize..20,
        ) {
            let mut top = TopK::new(k);
            for (i, &d) in dists.iter().enumerate() {
                top.push(i as u32, d);
            }
            let got = top.into_sorted_vec();

            let mut expected: Vec<(u32, f32)> =
                dists.iter().enumerate().map(|(i, &d)| (i as u32, d)).collect();
            expected.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            expected.truncate(k);

            prop_assert_eq!(got, expected);
        }
    }
}

mod ivf_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn full_probe_ivf_flat_is_exact(
            rows in arb_rows(6, 20, 120),
            query in prop::collection::vec(-10.0f32..10.0, 6),
            n_list in 1usize..8,
            k in 1usize..15,
        ) {
            let store = VectorStore::from_rows(&rows).unwrap();
            let index = IVFFlatIndex::build(&store, &IVFFlatParams { n_list, ..Default::default() }).unwrap();
            let got: Vec<u32> = index
                .search(&query, k, n_list)
                .unwrap()
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            prop_assert_eq!(got, exact_knn(&query, &rows, k));
        }

        #[test]
        fn ivf_pq_results_are_well_formed(
            rows in arb_rows(8, 64, 200),
            query in prop::collection::vec(-10.0f32..10.0, 8),
            n_probe in 1usize..10,
            k in 1usize..30,
        ) {
            let store = VectorStore::from_rows(&rows).unwrap();
            let params = IVFPQParams { n_list: 4, m: 4, n_bits: 4, ..Default::default() };
            let index = IVFPQIndex::build(&store, &params).unwrap();
            let hits = index.search(&query, k, n_probe).unwrap();

            prop_assert!(hits.len() <= k);
            let mut ids: Vec<u32> = hits.iter().map(|&(id, _)| id).collect();
            prop_assert!(ids.iter().all(|&id| (id as usize) < rows.len()));
            prop_assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), hits.len());
        }
    }
}

#[cfg(feature = "sq")]
mod sq_props {
    use super::*;
    use cellprobe::quantization::{QuantizerType, ScalarQuantizer};

    fn arb_qtype() -> impl Strategy<Value = QuantizerType> {
        prop::sample::select(QuantizerType::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn reconstruction_within_half_step(
            rows in arb_rows(5, 1, 40),
            qtype in arb_qtype(),
        ) {
            let flat: Vec<f32> = rows.iter().flatten().copied().collect();
            let sq = ScalarQuantizer::train(&flat, rows.len(), 5, qtype).unwrap();
            // fp16 has ~3 significant decimal digits over [-10, 10].
            let bound = match qtype {
                QuantizerType::Fp16 => 0.01,
                _ => sq.max_step_error() + 1e-4,
            };
            for row in &rows {
                let code = sq.encode(row);
                prop_assert_eq!(code.len(), qtype.code_len(5));
                prop_assert_eq!(sq.encode(row), code.clone());
                for (a, b) in row.iter().zip(sq.decode(&code)) {
                    prop_assert!((a - b).abs() <= bound, "{:?}: {} vs {}", qtype, a, b);
                }
            }
        }
    }
}
