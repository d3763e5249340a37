use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::accumulator::{Accumulator, Moments};
use crate::distance::{DistanceMeasure, MeasureKind};
use crate::error::{Error, Result};
use crate::vector::SparseVector;

/// A loosely bounded cluster produced by one canopy formation pass.
///
/// The canopy owns an [`Accumulator`] for its statistics and a shared handle to
/// the distance measure it was formed with.
#[derive(Clone, Debug)]
pub struct Canopy {
    id: usize,
    stats: Accumulator,
    measure: Arc<dyn DistanceMeasure>,
}

impl Canopy {
    /// Seed a canopy at `point`.
    pub fn new(point: SparseVector, id: usize, measure: Arc<dyn DistanceMeasure>) -> Self {
        Self {
            id,
            stats: Accumulator::new(point),
            measure,
        }
    }

    /// Id assigned at creation, unique within its formation pass.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// `C-<id>`.
    pub fn identifier(&self) -> String {
        format!("C-{}", self.id)
    }

    /// Center as of the last finalize (the seed point before the first one).
    #[inline]
    pub fn center(&self) -> &SparseVector {
        self.stats.center()
    }

    /// Per-dimension spread as of the last finalize.
    #[inline]
    pub fn radius(&self) -> &SparseVector {
        self.stats.radius()
    }

    /// Points folded in by the last finalize.
    #[inline]
    pub fn num_observations(&self) -> u64 {
        self.stats.num_observations()
    }

    /// Points folded in over the canopy's lifetime.
    #[inline]
    pub fn total_observations(&self) -> u64 {
        self.stats.total_observations()
    }

    /// The canopy's running statistics.
    pub fn stats(&self) -> &Accumulator {
        &self.stats
    }

    /// The measure this canopy is bound to.
    pub fn measure(&self) -> &Arc<dyn DistanceMeasure> {
        &self.measure
    }

    /// Absorb `point`.
    pub fn observe(&mut self, point: &SparseVector) {
        self.stats.observe(point);
    }

    /// Crystallize pending observations into center and radius.
    pub fn finalize(&mut self) {
        self.stats.finalize();
    }

    /// Pending sum if points are in flight, else the finalized center.
    pub fn compute_centroid(&self) -> &SparseVector {
        self.stats.compute_centroid()
    }

    /// Affinity of `point` to this canopy: `1 / (1 + distance)`.
    pub fn pdf(&self, point: &SparseVector) -> f64 {
        1.0 / (1.0 + self.measure.distance(point, self.center()))
    }

    /// Full transmission form, including in-flight moments.
    pub fn to_record(&self) -> CanopyRecord {
        CanopyRecord {
            measure: self.measure.kind(),
            id: self.id,
            num_observations: self.stats.num_observations(),
            total_observations: self.stats.total_observations(),
            center: self.stats.center().clone(),
            radius: self.stats.radius().clone(),
            s0: self.stats.pending_count(),
            s1: self.stats.pending_sum().cloned(),
            s2: self.stats.pending_sum_of_squares().cloned(),
        }
    }

    /// Rebuild a canopy from its transmission form.
    ///
    /// The measure is re-instantiated from its tag, settings included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMeasure`] if the tag is
    /// [`MeasureKind::Custom`]; use [`from_record_with`](Self::from_record_with)
    /// for those. Otherwise fails as `from_record_with` does.
    pub fn from_record(record: CanopyRecord) -> Result<Self> {
        let measure = record.measure.instantiate()?;
        Self::from_record_with(record, measure)
    }

    /// Rebuild a canopy from its transmission form, bound to `measure`.
    ///
    /// The record's measure tag is not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the pending moments are
    /// inconsistent: a non-zero `s0` needs both `s1` and `s2`, and a zero `s0`
    /// allows neither.
    pub fn from_record_with(record: CanopyRecord, measure: Arc<dyn DistanceMeasure>) -> Result<Self> {
        let moments = match (record.s0, record.s1, record.s2) {
            (0, None, None) => Moments::Empty,
            (s0, Some(sum), Some(sum_of_squares)) if s0 > 0 => Moments::Accumulating {
                sum,
                sum_of_squares,
            },
            _ => {
                return Err(Error::InvalidParameter {
                    name: "s0",
                    message: "pending count disagrees with pending moments",
                })
            }
        };
        Ok(Self {
            id: record.id,
            stats: Accumulator::from_parts(
                record.center,
                record.radius,
                record.num_observations,
                record.total_observations,
                record.s0,
                moments,
            ),
            measure,
        })
    }
}

impl fmt::Display for Canopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{n={} c={}}}",
            self.identifier(),
            self.num_observations(),
            self.center()
        )
    }
}

/// Serializable form of a [`Canopy`], used to hand canopies across pass or
/// partition boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanopyRecord {
    /// Tag of the measure the canopy was bound to.
    pub measure: MeasureKind,
    /// Canopy id.
    pub id: usize,
    /// Points folded in by the last finalize.
    pub num_observations: u64,
    /// Points folded in over the canopy's lifetime.
    pub total_observations: u64,
    /// Finalized center.
    pub center: SparseVector,
    /// Finalized radius.
    pub radius: SparseVector,
    /// Pending observation count.
    pub s0: u64,
    /// Pending sum.
    pub s1: Option<SparseVector>,
    /// Pending sum of squares.
    pub s2: Option<SparseVector>,
}
