//! Sequential two-pass canopy clustering over partitioned input.
//!
//! Each partition goes through its own formation pass with `(t1, t2)`; the
//! surviving canopy centers from every partition are then merged by one more
//! pass with `(t3, t4)`. After each pass, canopies whose `num_observations`
//! does not exceed `cluster_filter` are discarded.

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::canopy::Canopy;
use super::clusterer::CanopyClusterer;
use crate::distance::{DistanceMeasure, MeasureKind};
use crate::error::{Error, Result};
use crate::vector::SparseVector;

/// Canopy clustering parameters.
///
/// Plain data: load it with any serde format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyConfig {
    /// Absorb threshold for partition passes.
    pub t1: f64,

    /// Binding threshold for partition passes.
    pub t2: f64,

    /// Absorb threshold for the merge pass (defaults to `t1`).
    pub t3: Option<f64>,

    /// Binding threshold for the merge pass (defaults to `t2`).
    pub t4: Option<f64>,

    /// Canopies must absorb more than this many points to be emitted.
    pub cluster_filter: u64,

    /// Distance measure to bind canopies to.
    pub measure: MeasureKind,
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            t1: 0.5,
            t2: 0.3,
            t3: None,
            t4: None,
            cluster_filter: 0,
            measure: MeasureKind::default(),
        }
    }
}

impl CanopyConfig {
    /// Set the partition-pass thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, t1: f64, t2: f64) -> Self {
        self.t1 = t1;
        self.t2 = t2;
        self
    }

    /// Set the merge-pass thresholds.
    #[must_use]
    pub fn with_merge_thresholds(mut self, t3: f64, t4: f64) -> Self {
        self.t3 = Some(t3);
        self.t4 = Some(t4);
        self
    }

    /// Set the minimum-size filter.
    #[must_use]
    pub fn with_cluster_filter(mut self, cluster_filter: u64) -> Self {
        self.cluster_filter = cluster_filter;
        self
    }

    /// Set the distance measure.
    #[must_use]
    pub fn with_measure(mut self, measure: MeasureKind) -> Self {
        self.measure = measure;
        self
    }

    /// Effective merge-pass absorb threshold.
    pub fn merge_t1(&self) -> f64 {
        self.t3.unwrap_or(self.t1)
    }

    /// Effective merge-pass binding threshold.
    pub fn merge_t2(&self) -> f64 {
        self.t4.unwrap_or(self.t2)
    }

    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if any threshold is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("t1", self.t1),
            ("t2", self.t2),
            ("t3", self.merge_t1()),
            ("t4", self.merge_t2()),
        ];
        for (name, t) in thresholds {
            if !t.is_finite() || t < 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    message: "must be finite and non-negative",
                });
            }
        }
        Ok(())
    }
}

/// Runs partition passes and the merge pass in sequence.
#[derive(Clone, Debug)]
pub struct CanopyDriver {
    config: CanopyConfig,
    measure: Arc<dyn DistanceMeasure>,
}

impl CanopyDriver {
    /// Driver using the measure named by `config.measure`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the config is invalid, and
    /// [`Error::UnknownMeasure`] if `config.measure` is a custom tag.
    pub fn new(config: CanopyConfig) -> Result<Self> {
        let measure = config.measure.instantiate()?;
        Self::with_measure(config, measure)
    }

    /// Driver using a caller-supplied measure; `config.measure` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the config is invalid.
    pub fn with_measure(config: CanopyConfig, measure: Arc<dyn DistanceMeasure>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, measure })
    }

    /// The driver's configuration.
    pub fn config(&self) -> &CanopyConfig {
        &self.config
    }

    /// Cluster one partition and return the centers of canopies that pass the
    /// size filter, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the thresholds are invalid.
    pub fn partition_pass<I>(&self, points: I) -> Result<Vec<SparseVector>>
    where
        I: IntoIterator,
        I::Item: Borrow<SparseVector>,
    {
        let mut clusterer = CanopyClusterer::new(Arc::clone(&self.measure), self.config.t1, self.config.t2)?;
        let canopies = clusterer.cluster(points);
        let formed = canopies.len();

        let centers: Vec<SparseVector> = canopies
            .into_iter()
            .filter(|c| c.num_observations() > self.config.cluster_filter)
            .map(|c| c.center().clone())
            .collect();
        info!(formed, emitted = centers.len(), "partition pass complete");
        Ok(centers)
    }

    /// Merge first-pass centers into final canopies with the merge thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the thresholds are invalid.
    pub fn merge_pass<I>(&self, centers: I) -> Result<Vec<Canopy>>
    where
        I: IntoIterator,
        I::Item: Borrow<SparseVector>,
    {
        let mut clusterer = CanopyClusterer::new(Arc::clone(&self.measure), self.config.t1, self.config.t2)?
            .with_merge_thresholds(self.config.merge_t1(), self.config.merge_t2())?;
        clusterer.use_t3_t4();
        let canopies = clusterer.cluster(centers);
        let formed = canopies.len();

        let kept: Vec<Canopy> = canopies
            .into_iter()
            .filter(|c| c.num_observations() > self.config.cluster_filter)
            .collect();
        info!(formed, emitted = kept.len(), "merge pass complete");
        Ok(kept)
    }

    /// Partition passes over each partition in order, then one merge pass over
    /// all of their centers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the thresholds are invalid.
    pub fn run<P, I>(&self, partitions: P) -> Result<Vec<Canopy>>
    where
        P: IntoIterator<Item = I>,
        I: IntoIterator,
        I::Item: Borrow<SparseVector>,
    {
        let mut centers = Vec::new();
        for partition in partitions {
            centers.extend(self.partition_pass(partition)?);
        }
        self.merge_pass(&centers)
    }
}
