//! Banded edit distance over token sequences.
//!
//! Two vectors are compared as ordered sequences of their non-zero values.
//! Only edit distances up to a fraction of the longer sequence's length are
//! resolved exactly; anything further apart is reported as maximally
//! dissimilar (`1.0`). Restricting the dynamic program to a diagonal band of
//! half-width `threshold` keeps the cost at `O(len * threshold)`, and sequences
//! whose lengths differ by more than the band are rejected before the table is
//! filled past the first rows.
//!
//! Tokens are compared with exact floating-point equality.

use super::{DistanceMeasure, MeasureKind};
use crate::error::{Error, Result};
use crate::vector::SparseVector;

/// Default fraction of the longer sequence's length that is resolved exactly.
pub const DEFAULT_MAX_RELATIVE_DIFFERENCE: f64 = 0.2;

// Cost of a cell outside the band.
const UNREACHABLE: usize = usize::MAX;

/// Normalized, banded Levenshtein distance between vectors read as sequences.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Levenshtein {
    max_relative_difference: f64,
}

impl Default for Levenshtein {
    fn default() -> Self {
        Self {
            max_relative_difference: DEFAULT_MAX_RELATIVE_DIFFERENCE,
        }
    }
}

impl Levenshtein {
    /// Measure with the default band ratio (0.2).
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure resolving edit distances up to `ratio * max(len_a, len_b)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless `ratio` is finite and in `(0, 1]`.
    pub fn with_max_relative_difference(ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(Error::InvalidParameter {
                name: "max_relative_difference",
                message: "must be finite and in (0, 1]",
            });
        }
        Ok(Self {
            max_relative_difference: ratio,
        })
    }

    /// Configured band ratio.
    pub fn max_relative_difference(&self) -> f64 {
        self.max_relative_difference
    }

    /// Band half-width used for sequences whose longer length is `max_len`.
    #[inline]
    pub fn band(&self, max_len: usize) -> usize {
        (max_len as f64 * self.max_relative_difference).ceil() as usize
    }
}

impl DistanceMeasure for Levenshtein {
    fn distance(&self, a: &SparseVector, b: &SparseVector) -> f64 {
        let s: Vec<f64> = a.values().collect();
        let t: Vec<f64> = b.values().collect();
        let threshold = self.band(s.len().max(t.len()));
        bounded_levenshtein(&s, &t, threshold)
    }

    fn kind(&self) -> MeasureKind {
        MeasureKind::Levenshtein {
            max_relative_difference: self.max_relative_difference,
        }
    }
}

/// Edit distance between `s` and `t`, resolved only up to `threshold` edits.
///
/// Returns the raw distance divided by the longer length when it is at most
/// `threshold`, and `1.0` otherwise.
///
/// When one sequence is empty the result is the other's *raw* length if that
/// length is at most `threshold` (it is not normalized), else `1.0`. Through
/// [`Levenshtein::distance`] that branch can only yield `0.0` or `1.0`, but a
/// caller supplying its own threshold can observe values above one.
#[allow(clippy::needless_range_loop)]
pub fn bounded_levenshtein(s: &[f64], t: &[f64], threshold: usize) -> f64 {
    if s.is_empty() {
        return if t.len() <= threshold { t.len() as f64 } else { 1.0 };
    }
    if t.is_empty() {
        return if s.len() <= threshold { s.len() as f64 } else { 1.0 };
    }

    let longest = s.len().max(t.len());
    // Keep the row buffers as short as possible.
    let (s, t) = if s.len() > t.len() { (t, s) } else { (s, t) };
    let n = s.len();
    let m = t.len();

    let mut prev = vec![UNREACHABLE; n + 1];
    let mut curr = vec![UNREACHABLE; n + 1];

    let boundary = n.min(threshold) + 1;
    for (i, cell) in prev.iter_mut().take(boundary).enumerate() {
        *cell = i;
    }

    for j in 1..=m {
        let t_j = t[j - 1];
        curr[0] = j;

        let lo = j.saturating_sub(threshold).max(1);
        let hi = j.saturating_add(threshold).min(n);

        // The band has walked off the table: lengths differ by more than `threshold`.
        if lo > hi {
            return 1.0;
        }

        // Left of the band.
        if lo > 1 {
            curr[lo - 1] = UNREACHABLE;
        }

        for i in lo..=hi {
            curr[i] = if s[i - 1] == t_j {
                prev[i - 1]
            } else {
                curr[i - 1].min(prev[i]).min(prev[i - 1]).saturating_add(1)
            };
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    // Beyond the band the value is not guaranteed to be the true distance.
    if prev[n] <= threshold {
        prev[n] as f64 / longest as f64
    } else {
        1.0
    }
}
