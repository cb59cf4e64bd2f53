//! Point-to-point Iterative Closest Point.
//!
//! Every iteration pairs each moved source point with its closest target point
//! and solves for the rigid motion that best maps the pairs with the Kabsch
//! algorithm. The scale of the initial estimate is kept fixed.

use cloud_types::PointCloud;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::correspondence::{Correspondence, PointIndex};
use crate::kabsch::compute_rigid_transform;
use crate::solver::{iterate, LoopSettings, StepSolver};
use crate::{AlignmentOutcome, RegistrationError, RegistrationResult, SimilarityTransform};

/// Knobs for [`icp_align`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IcpParams {
    /// Iteration cap; 100 unless overridden.
    pub max_iterations: u32,
    /// Stop once the RMS error changes by less than this between iterations.
    pub convergence_threshold: f64,
    /// Pairs farther apart than this are ignored. Unbounded when `None`.
    pub max_correspondence_distance: Option<f64>,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-6,
            max_correspondence_distance: None,
        }
    }
}

impl IcpParams {
    /// Same as [`IcpParams::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, cap: u32) -> Self {
        self.max_iterations = cap;
        self
    }

    /// Overrides the RMS-change stopping threshold.
    #[must_use]
    pub const fn with_convergence_threshold(mut self, delta: f64) -> Self {
        self.convergence_threshold = delta;
        self
    }

    /// Ignores pairs farther apart than `limit`.
    #[must_use]
    pub const fn with_max_correspondence_distance(mut self, limit: f64) -> Self {
        self.max_correspondence_distance = Some(limit);
        self
    }

    pub(crate) const fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_iterations: self.max_iterations,
            convergence_threshold: self.convergence_threshold,
            max_correspondence_distance: self.max_correspondence_distance,
        }
    }
}

struct KabschStep;

impl StepSolver for KabschStep {
    fn step(
        &self,
        _current: &SimilarityTransform,
        moved: &[Point3<f64>],
        pairs: &[Correspondence],
        target: &PointIndex,
    ) -> RegistrationResult<SimilarityTransform> {
        if pairs.is_empty() {
            return Err(RegistrationError::NoCorrespondences);
        }
        let targets = target.points();
        let (from, to): (Vec<_>, Vec<_>) = pairs
            .iter()
            .map(|c| (moved[c.source_idx], targets[c.target_idx]))
            .unzip();
        compute_rigid_transform(&from, &to, false)
    }
}

/// Refines `initial` so that `source` lands on `target` with point-to-point ICP.
///
/// Never fails: degenerate input ends the run with a `Diverged` status and the
/// best transform seen so far.
#[must_use]
pub fn icp_align(
    source: &PointCloud,
    target: &PointCloud,
    initial: &SimilarityTransform,
    params: &IcpParams,
) -> AlignmentOutcome {
    let index = PointIndex::new(&target.positions());
    iterate(
        &source.positions(),
        &index,
        *initial,
        &params.loop_settings(),
        &KabschStep,
    )
}
