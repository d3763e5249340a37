//! Two partitions of user journeys, clustered per partition and then merged.
//!
//! Run with `RUST_LOG=debug` to watch points being absorbed.

use canopy::{CanopyConfig, CanopyDriver, MeasureKind, SparseVector};
use tracing_subscriber::EnvFilter;

fn journey(steps: &[f64]) -> SparseVector {
    SparseVector::from_dense(steps)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Each slot is one step of a journey; the value names the campaign touched.
    let partition_a = vec![
        journey(&[1.0, 2.0, 3.0, 4.0, 5.0]),
        journey(&[1.0, 2.0, 3.0, 4.0, 6.0]),
        journey(&[1.0, 2.0, 3.0, 4.0, 5.0]),
        journey(&[7.0, 7.0, 8.0, 9.0, 9.0]),
        journey(&[7.0, 7.0, 8.0, 9.0, 2.0]),
    ];
    let partition_b = vec![
        journey(&[7.0, 7.0, 8.0, 9.0, 9.0]),
        journey(&[1.0, 2.0, 3.0, 4.0, 5.0]),
        journey(&[7.0, 7.0, 8.0, 0.0, 9.0, 9.0]),
        journey(&[1.0, 2.0, 3.0, 4.0, 5.0]),
    ];

    let config = CanopyConfig::default()
        .with_measure(MeasureKind::Levenshtein {
            max_relative_difference: 0.2,
        })
        .with_thresholds(0.25, 0.1);
    let driver = match CanopyDriver::new(config) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return;
        }
    };

    match driver.run([partition_a, partition_b]) {
        Ok(canopies) => {
            println!("=== {} canopies ===", canopies.len());
            for canopy in &canopies {
                println!("  {canopy}");
            }
        }
        Err(e) => eprintln!("clustering failed: {e}"),
    }
}
