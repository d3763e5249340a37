use super::{DistanceMeasure, MeasureKind};
use crate::vector::SparseVector;

/// Euclidean (L2) distance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Euclidean;

impl DistanceMeasure for Euclidean {
    #[inline]
    fn distance(&self, a: &SparseVector, b: &SparseVector) -> f64 {
        a.squared_distance(b).sqrt()
    }

    /// `sqrt(|c|² - 2 c·v + |v|²)`, reusing the caller's `|c|²`.
    fn distance_with_norm(&self, centroid_norm_sq: f64, centroid: &SparseVector, v: &SparseVector) -> f64 {
        let sq = centroid_norm_sq - 2.0 * centroid.dot(v) + v.norm_squared();
        // Cancellation can leave a tiny negative.
        sq.max(0.0).sqrt()
    }

    fn kind(&self) -> MeasureKind {
        MeasureKind::Euclidean
    }
}
