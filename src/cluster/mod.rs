//! Canopy clustering.
//!
//! Canopies are cheap, overlapping groups formed in one streaming pass. They
//! are a precursor to an exact clustering algorithm: any two points that end
//! up in the same final cluster were compared at least once, so the
//! downstream step can skip the all-pairs comparison.
//!
//! ## Pieces
//!
//! - [`Accumulator`]: running count, sum and sum of squares of absorbed
//!   points, crystallized into a center/radius snapshot on `finalize`.
//! - [`Canopy`]: an id, an accumulator and the distance measure it is bound to.
//! - [`CanopyClusterer`]: the greedy single-pass formation engine.
//! - [`CanopyDriver`]: partition passes followed by a merge pass, with the
//!   minimum-size filter applied after each.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use canopy::{CanopyClusterer, Euclidean, SparseVector};
//!
//! let points: Vec<SparseVector> = [[1.0, 0.0], [1.1, 0.0], [5.0, 0.0], [5.2, 0.0]]
//!     .iter()
//!     .map(|p| SparseVector::from_dense(p))
//!     .collect();
//!
//! let mut clusterer = CanopyClusterer::new(Arc::new(Euclidean), 0.5, 1.0).unwrap();
//! let canopies = clusterer.cluster(&points);
//!
//! assert_eq!(canopies.len(), 2);
//! assert_eq!(canopies[0].num_observations(), 1);
//! assert_eq!(canopies[1].num_observations(), 1);
//! ```

mod accumulator;
mod canopy;
mod clusterer;
mod driver;

pub use accumulator::Accumulator;
pub use canopy::{Canopy, CanopyRecord};
pub use clusterer::CanopyClusterer;
pub use driver::{CanopyConfig, CanopyDriver};
