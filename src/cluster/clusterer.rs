//! Canopy formation.
//!
//! # The Algorithm (McCallum, Nigam & Ungar, 2000)
//!
//! Canopy clustering cheaply partitions data into overlapping groups so that
//! an expensive clustering step only needs to compare points sharing a canopy.
//! Two thresholds drive it:
//!
//! - **T1** (loose): a point closer than T1 to a canopy's center joins it. A
//!   point may join several canopies.
//! - **T2** (tight): a point closer than T2 to some canopy is *strongly bound*
//!   and never seeds a canopy of its own.
//!
//! ## Streaming formulation
//!
//! The reference algorithm iterates points per canopy and needs the whole
//! dataset in memory. [`CanopyClusterer::add_point_to_canopies`] inverts the
//! loops: each incoming point is compared with every existing canopy (in
//! creation order), so only one running aggregate per canopy is retained and a
//! pass consumes its input exactly once. The result depends on input order.
//!
//! ## Two passes
//!
//! Independent partitions are each run through one pass with `(t1, t2)`. The
//! finalized centers of all partitions are then fed, in a single sequential
//! pass, through an engine switched to the merge thresholds `(t3, t4)` with
//! [`CanopyClusterer::use_t3_t4`]. [`CanopyDriver`](super::CanopyDriver) wires
//! this together.

use std::borrow::Borrow;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use super::canopy::Canopy;
use crate::distance::DistanceMeasure;
use crate::error::{Error, Result};
use crate::vector::SparseVector;

/// Streaming canopy formation engine.
#[derive(Clone, Debug)]
pub struct CanopyClusterer {
    next_canopy_id: usize,
    t1: f64,
    t2: f64,
    t3: f64,
    t4: f64,
    measure: Arc<dyn DistanceMeasure>,
}

impl CanopyClusterer {
    /// Create an engine with absorb threshold `t1` and binding threshold `t2`.
    ///
    /// The merge thresholds `t3`/`t4` default to `t1`/`t2`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a threshold is negative or not finite.
    pub fn new(measure: Arc<dyn DistanceMeasure>, t1: f64, t2: f64) -> Result<Self> {
        check_thresholds("t1", t1, "t2", t2)?;
        Ok(Self {
            next_canopy_id: 0,
            t1,
            t2,
            t3: t1,
            t4: t2,
            measure,
        })
    }

    /// Set the thresholds used after [`use_t3_t4`](Self::use_t3_t4).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a threshold is negative or not finite.
    pub fn with_merge_thresholds(mut self, t3: f64, t4: f64) -> Result<Self> {
        check_thresholds("t3", t3, "t4", t4)?;
        self.t3 = t3;
        self.t4 = t4;
        Ok(self)
    }

    /// Start canopy ids at `id` instead of zero.
    ///
    /// Ids count up from `id` and stop at `usize::MAX`: once that id has been
    /// handed out, every further canopy reuses it.
    #[must_use]
    pub fn with_first_id(mut self, id: usize) -> Self {
        self.next_canopy_id = id;
        self
    }

    /// Absorb threshold.
    pub fn t1(&self) -> f64 {
        self.t1
    }

    /// Binding threshold.
    pub fn t2(&self) -> f64 {
        self.t2
    }

    /// Merge-pass absorb threshold.
    pub fn t3(&self) -> f64 {
        self.t3
    }

    /// Merge-pass binding threshold.
    pub fn t4(&self) -> f64 {
        self.t4
    }

    /// Id the next created canopy will receive.
    pub fn next_canopy_id(&self) -> usize {
        self.next_canopy_id
    }

    /// The measure new canopies are bound to.
    pub fn measure(&self) -> &Arc<dyn DistanceMeasure> {
        &self.measure
    }

    /// Switch the active thresholds to the merge pair `(t3, t4)`.
    pub fn use_t3_t4(&mut self) {
        self.t1 = self.t3;
        self.t2 = self.t4;
    }

    /// Add one point to the canopy collection.
    ///
    /// The point is observed by every canopy whose center is closer than `t1`.
    /// Unless some canopy's center is closer than `t2`, a new canopy seeded at
    /// the point is appended. The seed is not observed by its own canopy.
    pub fn add_point_to_canopies(&mut self, point: &SparseVector, canopies: &mut Vec<Canopy>) {
        let mut strongly_bound = false;
        for canopy in canopies.iter_mut() {
            let dist = self.measure.distance(canopy.center(), point);
            if dist < self.t1 {
                debug!(canopy = canopy.id(), dist, "point absorbed");
                canopy.observe(point);
            }
            strongly_bound = strongly_bound || dist < self.t2;
        }
        if !strongly_bound {
            let id = self.next_canopy_id;
            match id.checked_add(1) {
                Some(next) => self.next_canopy_id = next,
                None => warn!(canopy = id, "canopy ids exhausted, reusing the last id"),
            }
            debug!(canopy = id, "new canopy");
            canopies.push(Canopy::new(point.clone(), id, Arc::clone(&self.measure)));
        }
    }

    /// Run one full pass: add every point in order, then finalize every canopy.
    pub fn cluster<I>(&mut self, points: I) -> Vec<Canopy>
    where
        I: IntoIterator,
        I::Item: Borrow<SparseVector>,
    {
        let mut canopies = Vec::new();
        for point in points {
            self.add_point_to_canopies(point.borrow(), &mut canopies);
        }
        for canopy in &mut canopies {
            canopy.finalize();
        }
        canopies
    }

    /// Reference (batch) canopy formation.
    ///
    /// Take the first remaining point as a seed, let every other remaining
    /// point closer than `t1` join its canopy, and drop from further
    /// consideration every point closer than `t2`. Repeat until no points
    /// remain. Unlike the streaming pass, removed points never join later
    /// canopies, so the partitions can differ.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a threshold is negative or not finite.
    pub fn create_canopies(
        points: Vec<SparseVector>,
        measure: Arc<dyn DistanceMeasure>,
        t1: f64,
        t2: f64,
    ) -> Result<Vec<Canopy>> {
        check_thresholds("t1", t1, "t2", t2)?;

        let mut remaining: VecDeque<SparseVector> = points.into();
        let mut canopies = Vec::new();
        let mut next_id = 0;

        while let Some(seed) = remaining.pop_front() {
            let mut canopy = Canopy::new(seed.clone(), next_id, Arc::clone(&measure));
            next_id += 1;
            remaining.retain(|p| {
                let dist = measure.distance(&seed, p);
                if dist < t1 {
                    canopy.observe(p);
                }
                dist >= t2
            });
            canopy.finalize();
            canopies.push(canopy);
        }
        Ok(canopies)
    }
}

fn check_thresholds(loose_name: &'static str, loose: f64, tight_name: &'static str, tight: f64) -> Result<()> {
    for (name, t) in [(loose_name, loose), (tight_name, tight)] {
        if !t.is_finite() || t < 0.0 {
            return Err(Error::InvalidParameter {
                name,
                message: "must be finite and non-negative",
            });
        }
    }
    if loose < tight {
        warn!(
            loose,
            tight, "{loose_name} < {tight_name}: strongly bound points may fall outside every canopy"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Euclidean, Levenshtein};

    fn v(values: &[f64]) -> SparseVector {
        SparseVector::from_dense(values)
    }

    fn euclidean() -> Arc<dyn DistanceMeasure> {
        Arc::new(Euclidean)
    }

    #[test]
    fn two_separated_groups() {
        let points = [v(&[1.0, 0.0]), v(&[1.1, 0.0]), v(&[5.0, 0.0]), v(&[5.2, 0.0])];
        let mut clusterer = CanopyClusterer::new(euclidean(), 0.5, 1.0).unwrap();

        let mut canopies = Vec::new();
        for p in &points {
            clusterer.add_point_to_canopies(p, &mut canopies);
        }

        assert_eq!(canopies.len(), 2);
        assert_eq!(canopies[0].center(), &points[0]);
        assert_eq!(canopies[1].center(), &points[2]);
        assert_eq!(canopies[0].stats().pending_count(), 1);
        assert_eq!(canopies[1].stats().pending_count(), 1);

        for c in &mut canopies {
            c.finalize();
        }
        assert_eq!(canopies[0].center(), &points[1]);
        assert_eq!(canopies[1].center(), &points[3]);
        assert_eq!(canopies[0].num_observations(), 1);
    }

    #[test]
    fn point_joins_every_canopy_within_t1() {
        let mut clusterer = CanopyClusterer::new(euclidean(), 3.0, 1.0).unwrap();
        let mut canopies = Vec::new();
        clusterer.add_point_to_canopies(&v(&[0.0]), &mut canopies);
        clusterer.add_point_to_canopies(&v(&[4.0]), &mut canopies);
        assert_eq!(canopies.len(), 2);

        // Within t1 of both, strongly bound to neither.
        clusterer.add_point_to_canopies(&v(&[2.0]), &mut canopies);
        assert_eq!(canopies.len(), 3);
        assert_eq!(canopies[0].stats().pending_count(), 1);
        assert_eq!(canopies[1].stats().pending_count(), 1);
        assert_eq!(canopies[2].stats().pending_count(), 0);
    }

    #[test]
    fn loosely_bound_point_absorbed_and_seeds() {
        let mut clusterer = CanopyClusterer::new(euclidean(), 2.0, 0.5).unwrap();
        let mut canopies = Vec::new();
        clusterer.add_point_to_canopies(&v(&[0.0]), &mut canopies);
        clusterer.add_point_to_canopies(&v(&[1.0]), &mut canopies);

        assert_eq!(canopies.len(), 2);
        assert_eq!(canopies[0].stats().pending_count(), 1);
    }

    #[test]
    fn ids_are_sequential() {
        let mut clusterer = CanopyClusterer::new(euclidean(), 0.5, 0.5)
            .unwrap()
            .with_first_id(10);
        let canopies = clusterer.cluster((0..5).map(|i| v(&[f64::from(i) * 10.0])));
        let ids: Vec<usize> = canopies.iter().map(Canopy::id).collect();
        assert_eq!(ids, vec![10, 11, 12, 13, 14]);
        assert_eq!(clusterer.next_canopy_id(), 15);
    }

    #[test]
    fn ids_stop_at_usize_max() {
        let mut clusterer = CanopyClusterer::new(euclidean(), 1.0, 0.5)
            .unwrap()
            .with_first_id(usize::MAX - 1);
        let canopies = clusterer.cluster((0..3).map(|i| v(&[f64::from(i) * 10.0])));
        let ids: Vec<usize> = canopies.iter().map(Canopy::id).collect();
        assert_eq!(ids, vec![usize::MAX - 1, usize::MAX, usize::MAX]);
        assert_eq!(clusterer.next_canopy_id(), usize::MAX);
    }

    #[test]
    fn cluster_finalizes_every_canopy() {
        let mut clusterer = CanopyClusterer::new(euclidean(), 1.0, 0.5).unwrap();
        let points = vec![v(&[0.0]), v(&[0.2]), v(&[0.3]), v(&[10.0])];
        let canopies = clusterer.cluster(&points);

        assert_eq!(canopies.len(), 2);
        assert!(canopies.iter().all(|c| c.stats().pending_count() == 0));
        assert_eq!(canopies[0].num_observations(), 2);
        assert_eq!(canopies[0].center().to_dense(), vec![0.5]);
        assert_eq!(canopies[1].num_observations(), 0);
        assert_eq!(canopies[1].center().to_dense(), vec![10.0]);
    }

    #[test]
    fn use_t3_t4_switches_thresholds() {
        let mut clusterer = CanopyClusterer::new(euclidean(), 3.0, 2.0)
            .unwrap()
            .with_merge_thresholds(0.5, 0.25)
            .unwrap();
        assert_eq!((clusterer.t1(), clusterer.t2()), (3.0, 2.0));
        clusterer.use_t3_t4();
        assert_eq!((clusterer.t1(), clusterer.t2()), (0.5, 0.25));
        assert_eq!((clusterer.t3(), clusterer.t4()), (0.5, 0.25));
    }

    #[test]
    fn merge_thresholds_default_to_primary() {
        let clusterer = CanopyClusterer::new(euclidean(), 3.0, 2.0).unwrap();
        assert_eq!((clusterer.t3(), clusterer.t4()), (3.0, 2.0));
    }

    #[test]
    fn invalid_thresholds() {
        assert!(CanopyClusterer::new(euclidean(), -1.0, 0.5).is_err());
        assert!(CanopyClusterer::new(euclidean(), 1.0, f64::NAN).is_err());
        assert!(CanopyClusterer::new(euclidean(), f64::INFINITY, 0.5).is_err());
        let ok = CanopyClusterer::new(euclidean(), 1.0, 0.5).unwrap();
        assert!(ok.with_merge_thresholds(1.0, -0.1).is_err());
        assert!(CanopyClusterer::create_canopies(vec![], euclidean(), -1.0, 0.0).is_err());
    }

    #[test]
    fn canopies_share_the_engine_measure() {
        let mut clusterer = CanopyClusterer::new(Arc::new(Levenshtein::default()), 0.3, 0.1).unwrap();
        let canopies = clusterer.cluster([v(&[1.0, 2.0, 3.0]), v(&[7.0, 8.0, 9.0])]);
        assert_eq!(canopies.len(), 2);
        for c in &canopies {
            assert!(Arc::ptr_eq(c.measure(), clusterer.measure()));
        }
    }

    #[test]
    fn sequences_group_by_edit_distance() {
        let measure: Arc<dyn DistanceMeasure> = Arc::new(Levenshtein::default());
        let mut clusterer = CanopyClusterer::new(measure, 0.25, 0.15).unwrap();
        let points = [
            v(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            v(&[1.0, 2.0, 3.0, 4.0, 6.0]),
            v(&[9.0, 8.0, 7.0, 6.0, 5.0]),
            v(&[9.0, 8.0, 7.0, 6.0, 4.0]),
            v(&[1.0, 2.0, 3.0, 4.0, 5.0]),
        ];
        let mut canopies = Vec::new();
        for p in &points {
            clusterer.add_point_to_canopies(p, &mut canopies);
        }
        // 0.2 apart: absorbed (< 0.25) but not strongly bound (>= 0.15).
        assert_eq!(canopies.len(), 4);
        assert_eq!(canopies[0].stats().pending_count(), 2);
        assert_eq!(canopies[1].stats().pending_count(), 1);
        assert_eq!(canopies[2].stats().pending_count(), 1);
        assert_eq!(canopies[3].stats().pending_count(), 0);
    }

    #[test]
    fn batch_reference_removes_bound_points() {
        let points = vec![v(&[0.0]), v(&[0.4]), v(&[0.8]), v(&[5.0]), v(&[5.3])];
        let canopies = CanopyClusterer::create_canopies(points, euclidean(), 1.0, 0.5).unwrap();

        // Seed 0 absorbs 0.4 and 0.8, removes only 0.4; 0.8 then seeds its own.
        assert_eq!(canopies.len(), 3);
        let ids: Vec<usize> = canopies.iter().map(Canopy::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        assert_eq!(canopies[0].num_observations(), 2);
        assert!((canopies[0].center().get(0) - 1.2).abs() < 1e-12);
        assert_eq!(canopies[1].num_observations(), 0);
        assert_eq!(canopies[1].center().to_dense(), vec![0.8]);
        assert_eq!(canopies[2].num_observations(), 1);
        assert_eq!(canopies[2].center().to_dense(), vec![5.3]);
    }

    #[test]
    fn batch_reference_on_empty_input() {
        let canopies = CanopyClusterer::create_canopies(vec![], euclidean(), 1.0, 0.5).unwrap();
        assert!(canopies.is_empty());
    }
}
