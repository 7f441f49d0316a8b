//! IVF-PQ through the benchmark protocol: fit once, sweep `n_probe`.
//!
//! ```text
//! fit:    vectors -> k-means cells (IVF) -> PQ codes of residuals
//! query:  query -> n_probe nearest cells -> ADC table scan -> top-k
//! ```
//!
//! Prints recall@10, distance computations per query, and latency for each
//! `n_probe`, the same columns a benchmark run reports.
//!
//! ```bash
//! RUST_LOG=info cargo run --example ivf_pq_sweep --release
//! ```

use std::time::Instant;

use cellprobe::benchmark::{gaussian_clusters, mean_recall};
use cellprobe::{ANNIndex, Algorithm, AlgorithmConfig};

fn main() -> cellprobe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let k = 10;
    let data = gaussian_clusters(20_000, 200, 64, 40, 0.2, 42);
    let truth = data.ground_truth(k);

    let config = AlgorithmConfig::from_json(
        r#"{
            "metric": "euclidean",
            "index": {"kind": "ivf_pq", "n_list": 128, "m": 8, "n_bits": 8},
            "query_args": [1, 2, 4, 8, 16, 32, 128]
        }"#,
    )?;
    let sweep = config.query_args.clone();
    let mut algo = Algorithm::new(config)?;

    let start = Instant::now();
    algo.fit(&data.train)?;
    println!("Built {algo} in {:?}", start.elapsed());
    if let Some(index) = algo.built_index() {
        let raw = data.n_train() * data.dimension * 4;
        println!(
            "  {} vectors, {} bytes ({:.1}x smaller than raw f32)\n",
            index.num_vectors(),
            index.size_bytes(),
            raw as f64 / index.size_bytes() as f64
        );
    }

    println!("{:>8} {:>10} {:>14} {:>12}", "n_probe", "Recall@10", "dist/query", "Time/query");
    println!("{}", "-".repeat(48));

    for n_probe in sweep {
        algo.set_query_arguments(n_probe)?;
        let start = Instant::now();
        algo.batch_query(&data.test, k)?;
        let found = algo.get_batch_results()?;
        let per_query = start.elapsed() / data.n_test() as u32;

        println!(
            "{:>8} {:>9.1}% {:>14} {:>12?}",
            n_probe,
            mean_recall(&truth, &found, k) * 100.0,
            algo.additional().dist_comps / data.n_test(),
            per_query
        );
    }

    Ok(())
}
