//! Streaming canopy clustering for sparse sequence vectors.
//!
//! `canopy` groups high-dimensional sparse vectors into loose, overlapping
//! clusters in a single pass per partition, then merges the partitions with a
//! second pass of the same algorithm.
//!
//! The public API is split into:
//! - [`cluster`]: the moment accumulator, canopies, the formation engine and
//!   the two-pass driver
//! - [`distance`]: the [`DistanceMeasure`] trait, a banded edit distance over
//!   sequences and a Euclidean measure
//! - [`vector`]: the ordered sparse vector both of them work on

#![forbid(unsafe_code)]

pub mod cluster;
pub mod distance;
pub mod error;
pub mod vector;

pub use cluster::{Accumulator, Canopy, CanopyClusterer, CanopyConfig, CanopyDriver, CanopyRecord};
pub use distance::{bounded_levenshtein, DistanceMeasure, Euclidean, Levenshtein, MeasureKind};
pub use error::{Error, Result};
pub use vector::SparseVector;
