//! Distance measures between sparse vectors.
//!
//! The canopy engine is agnostic of the metric it runs with: it only needs a
//! [`DistanceMeasure`]. Two implementations ship with the crate:
//!
//! - [`Levenshtein`]: a banded edit distance over the vectors' non-zero values
//!   read as token sequences, normalized into `[0, 1]`.
//! - [`Euclidean`]: plain L2 distance, treating missing slots as zero.
//!
//! Every measure reports a [`MeasureKind`] tag so a canopy can record which
//! measure it was bound to and the receiving side of a transfer can rebuild it.

mod euclidean;
mod levenshtein;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vector::SparseVector;

pub use euclidean::Euclidean;
pub use levenshtein::{bounded_levenshtein, Levenshtein, DEFAULT_MAX_RELATIVE_DIFFERENCE};

/// A dissimilarity function between two vectors.
pub trait DistanceMeasure: fmt::Debug + Send + Sync {
    /// Distance between `a` and `b`.
    fn distance(&self, a: &SparseVector, b: &SparseVector) -> f64;

    /// Distance from `centroid` to `v`, given the centroid's precomputed squared
    /// L2 norm.
    ///
    /// Measures that have no use for the norm delegate to [`distance`](Self::distance).
    fn distance_with_norm(&self, centroid_norm_sq: f64, centroid: &SparseVector, v: &SparseVector) -> f64 {
        let _ = centroid_norm_sq;
        self.distance(centroid, v)
    }

    /// Tag naming this implementation and its settings.
    ///
    /// Measures defined outside this crate report [`MeasureKind::Custom`].
    fn kind(&self) -> MeasureKind;
}

/// Tag identifying a [`DistanceMeasure`] implementation along with the
/// settings needed to rebuild it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureKind {
    /// [`Levenshtein`] with the given band ratio.
    Levenshtein {
        /// Fraction of the longer sequence's length resolved exactly.
        #[serde(default = "default_max_relative_difference")]
        max_relative_difference: f64,
    },
    /// [`Euclidean`].
    Euclidean,
    /// A caller-supplied measure this crate cannot rebuild on its own.
    Custom(String),
}

fn default_max_relative_difference() -> f64 {
    DEFAULT_MAX_RELATIVE_DIFFERENCE
}

impl Default for MeasureKind {
    fn default() -> Self {
        MeasureKind::Levenshtein {
            max_relative_difference: DEFAULT_MAX_RELATIVE_DIFFERENCE,
        }
    }
}

impl MeasureKind {
    /// Build a fresh instance of the tagged measure with the recorded settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMeasure`] for [`MeasureKind::Custom`], and
    /// [`Error::InvalidParameter`] if a recorded band ratio is out of range.
    pub fn instantiate(&self) -> Result<Arc<dyn DistanceMeasure>> {
        match self {
            MeasureKind::Levenshtein {
                max_relative_difference,
            } => Ok(Arc::new(Levenshtein::with_max_relative_difference(
                *max_relative_difference,
            )?)),
            MeasureKind::Euclidean => Ok(Arc::new(Euclidean)),
            MeasureKind::Custom(name) => Err(Error::UnknownMeasure(name.clone())),
        }
    }

    /// Name of the tag, without settings.
    pub fn as_str(&self) -> &str {
        match self {
            MeasureKind::Levenshtein { .. } => "levenshtein",
            MeasureKind::Euclidean => "euclidean",
            MeasureKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the built-in measure names into their default settings.
impl FromStr for MeasureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levenshtein" | "edit" => Ok(MeasureKind::default()),
            "euclidean" | "l2" => Ok(MeasureKind::Euclidean),
            other => Err(Error::UnknownMeasure(other.to_string())),
        }
    }
}
