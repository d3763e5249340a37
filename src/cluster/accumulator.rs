//! Running moment sums for greedy, streaming clustering.
//!
//! An [`Accumulator`] carries two things:
//!
//! - the *snapshot* (`center`, `radius`, `num_observations`,
//!   `total_observations`) as of the last [`finalize`](Accumulator::finalize),
//! - the *pending* moments (`s0` count, `s1` sum, `s2` sum of squares) of
//!   points observed since then.
//!
//! `finalize` adopts the pending sums as the new snapshot verbatim: the center
//! becomes the raw sum `s1` and the radius the raw sum of squares `s2`, with no
//! division by the count. Thresholds used with this crate are tuned against
//! that behavior, so repeated cycles grow the center with the point count.

use crate::vector::SparseVector;

/// Pending first and second moments.
///
/// `Empty` until the first observation after creation or a finalize; the
/// vectors take their shape from that first point.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum Moments {
    #[default]
    Empty,
    Accumulating {
        sum: SparseVector,
        sum_of_squares: SparseVector,
    },
}

/// Incremental center/radius accumulator.
#[derive(Clone, Debug, PartialEq)]
pub struct Accumulator {
    center: SparseVector,
    radius: SparseVector,
    num_observations: u64,
    total_observations: u64,
    s0: u64,
    moments: Moments,
}

impl Accumulator {
    /// Start an accumulator whose center is `seed` and radius is zero.
    ///
    /// The seed itself is not counted as an observation.
    pub fn new(seed: SparseVector) -> Self {
        let radius = seed.like();
        Self {
            center: seed,
            radius,
            num_observations: 0,
            total_observations: 0,
            s0: 0,
            moments: Moments::Empty,
        }
    }

    pub(crate) fn from_parts(
        center: SparseVector,
        radius: SparseVector,
        num_observations: u64,
        total_observations: u64,
        s0: u64,
        moments: Moments,
    ) -> Self {
        Self {
            center,
            radius,
            num_observations,
            total_observations,
            s0,
            moments,
        }
    }

    /// Fold `point` into the pending moments.
    pub fn observe(&mut self, point: &SparseVector) {
        self.s0 += 1;
        match &mut self.moments {
            Moments::Empty => {
                self.moments = Moments::Accumulating {
                    sum: point.clone(),
                    sum_of_squares: point.squared(),
                };
            }
            Moments::Accumulating {
                sum,
                sum_of_squares,
            } => {
                *sum += point;
                sum_of_squares.add_squares(point);
            }
        }
    }

    /// Adopt the pending moments as the new center/radius and reset them.
    ///
    /// A no-op when nothing was observed since the last call, so calling it
    /// repeatedly is safe.
    pub fn finalize(&mut self) {
        if self.s0 == 0 {
            return;
        }
        self.num_observations = self.s0;
        self.total_observations += self.num_observations;
        if let Moments::Accumulating {
            sum,
            sum_of_squares,
        } = std::mem::take(&mut self.moments)
        {
            self.center = sum;
            self.radius = sum_of_squares;
        }
        self.s0 = 0;
    }

    /// Best-effort centroid without finalizing: the pending sum if anything
    /// is pending, else the last finalized center.
    pub fn compute_centroid(&self) -> &SparseVector {
        match &self.moments {
            Moments::Accumulating { sum, .. } if self.s0 != 0 => sum,
            _ => &self.center,
        }
    }

    /// Center as of the last finalize (the seed before the first one).
    #[inline]
    pub fn center(&self) -> &SparseVector {
        &self.center
    }

    /// Per-dimension spread as of the last finalize.
    #[inline]
    pub fn radius(&self) -> &SparseVector {
        &self.radius
    }

    /// Points folded into the center by the last finalize.
    #[inline]
    pub fn num_observations(&self) -> u64 {
        self.num_observations
    }

    /// Points folded in across every finalize so far.
    #[inline]
    pub fn total_observations(&self) -> u64 {
        self.total_observations
    }

    /// Points observed since the last finalize (`s0`).
    #[inline]
    pub fn pending_count(&self) -> u64 {
        self.s0
    }

    /// Pending sum `s1`, or `None` when nothing is pending.
    pub fn pending_sum(&self) -> Option<&SparseVector> {
        match &self.moments {
            Moments::Accumulating { sum, .. } => Some(sum),
            Moments::Empty => None,
        }
    }

    /// Pending element-wise sum of squares `s2`, or `None` when nothing is pending.
    pub fn pending_sum_of_squares(&self) -> Option<&SparseVector> {
        match &self.moments {
            Moments::Accumulating { sum_of_squares, .. } => Some(sum_of_squares),
            Moments::Empty => None,
        }
    }
}
