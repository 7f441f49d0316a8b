//! Boundary conditions through the harness adapter.

use cellprobe::{AnnError, Algorithm, Metric};

fn small_data() -> Vec<Vec<f32>> {
    (0..400)
        .map(|i| {
            let t = i as f32 * 0.05;
            vec![t.sin(), t.cos(), (i % 17) as f32 * 0.1, (i % 5) as f32 * 0.3]
        })
        .collect()
}

fn fitted_ivf_pq() -> Algorithm {
    let mut algo = Algorithm::ivf_pq(Metric::Euclidean, 8, 2, 4);
    algo.fit(&small_data()).expect("fit");
    algo
}

// =============================================================================
// Empty and unfitted indexes
// =============================================================================

#[test]
fn empty_dataset_queries_return_nothing() {
    let mut algo = Algorithm::ivf_pq(Metric::Euclidean, 100, 8, 8);
    algo.fit::<Vec<f32>, f32>(&[]).expect("empty fit");
    assert_eq!(algo.query(&[1.0, 2.0, 3.0], 10).unwrap(), Vec::<u32>::new());

    algo.batch_query(&[vec![0.0f32; 3], vec![1.0; 3]], 5).unwrap();
    assert_eq!(algo.get_batch_results().unwrap(), vec![Vec::<u32>::new(); 2]);
    assert_eq!(algo.additional().dist_comps, 0);
}

#[test]
fn query_before_fit() {
    let mut algo = Algorithm::ivf(Metric::Euclidean, 4);
    assert!(matches!(algo.query(&[0.0; 4], 1), Err(AnnError::NotReady(_))));
    assert!(matches!(
        algo.batch_query(&[vec![0.0f32; 4]], 1),
        Err(AnnError::NotReady(_))
    ));
}

// =============================================================================
// Argument validation
// =============================================================================

#[test]
fn zero_n_is_invalid() {
    let mut algo = fitted_ivf_pq();
    assert!(matches!(
        algo.query(&[0.0; 4], 0),
        Err(AnnError::InvalidArgument(_))
    ));
    assert!(matches!(
        algo.batch_query(&[vec![0.0f32; 4]], 0),
        Err(AnnError::InvalidArgument(_))
    ));
}

#[test]
fn zero_n_probe_is_invalid() {
    let mut algo = fitted_ivf_pq();
    assert!(matches!(
        algo.set_query_arguments(0),
        Err(AnnError::InvalidArgument(_))
    ));
}

#[test]
fn n_probe_above_n_list_clamps() {
    let mut algo = fitted_ivf_pq();
    let q = [0.3, 0.9, 0.5, 0.6];

    algo.set_query_arguments(8).unwrap();
    let full = algo.query(&q, 10).unwrap();
    let at_n_list = algo.additional().dist_comps;

    algo.set_query_arguments(1000).unwrap();
    assert_eq!(algo.query(&q, 10).unwrap(), full);
    assert_eq!(algo.additional().dist_comps, at_n_list);
}

#[test]
fn wrong_query_dimension() {
    let mut algo = fitted_ivf_pq();
    assert_eq!(
        algo.query(&[1.0, 2.0], 3).unwrap_err(),
        AnnError::DimensionMismatch {
            expected: 4,
            actual: 2
        }
    );
}

#[test]
fn ragged_rows_rejected_at_fit() {
    let mut algo = Algorithm::ivf(Metric::Euclidean, 2);
    let rows = vec![vec![1.0f32, 2.0], vec![3.0], vec![4.0, 5.0]];
    assert_eq!(
        algo.fit(&rows).unwrap_err(),
        AnnError::DimensionMismatch {
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn too_few_vectors_for_n_list() {
    let mut algo = Algorithm::ivf(Metric::Euclidean, 50);
    let err = algo.fit(&small_data()[..10]).unwrap_err();
    assert!(matches!(err, AnnError::InsufficientData { needed: 50, available: 10, .. }));
}

#[test]
fn bad_pq_geometry_is_invalid_config() {
    // 4 dimensions do not split into 3 segments.
    let mut algo = Algorithm::ivf_pq(Metric::Euclidean, 4, 3, 8);
    assert!(matches!(
        algo.fit(&small_data()),
        Err(AnnError::InvalidConfig(_))
    ));
}

// =============================================================================
// Input coercion
// =============================================================================

#[test]
fn f64_rows_are_accepted() {
    let rows: Vec<Vec<f64>> = small_data()
        .into_iter()
        .map(|r| r.into_iter().map(f64::from).collect())
        .collect();
    let mut algo = Algorithm::ivf(Metric::Euclidean, 4);
    algo.fit(&rows).unwrap();
    algo.set_query_arguments(4).unwrap();
    let target: Vec<f32> = rows[123].iter().map(|&x| x as f32).collect();
    assert_eq!(algo.query(&target, 1).unwrap(), vec![123]);
}

#[test]
fn fewer_candidates_than_n() {
    let mut algo = Algorithm::ivf(Metric::Euclidean, 2);
    algo.fit(&small_data()[..6]).unwrap();
    algo.set_query_arguments(2).unwrap();
    assert_eq!(algo.query(&[0.0; 4], 100).unwrap().len(), 6);

    algo.batch_query(&[vec![0.0f32; 4]], 100).unwrap();
    assert_eq!(algo.get_batch_results().unwrap()[0].len(), 6);
}
