//! Point-to-plane ICP.
//!
//! Minimizes the distance of every moved source point to the tangent plane of
//! its closest target point, linearized around the current pose:
//!
//! ```text
//! r_i = (p_i - q_i) . n_i
//! J_i = [ n_i ; p_i x n_i ]
//! (sum J J^T) delta = -(sum J r)
//! ```
//!
//! Target normals come from the cloud when every point carries one, and are
//! estimated from the k nearest neighbours otherwise.

use cloud_types::PointCloud;
use nalgebra::{Matrix6, Point3, Vector3, Vector6};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::correspondence::{Correspondence, PointIndex};
use crate::covariance::{estimate_normals, DEFAULT_K_NEIGHBORS};
use crate::solver::{
    increment_from_twist, iterate, solve_normal_equations, LoopSettings, StepSolver,
};
use crate::{AlignmentOutcome, RegistrationResult, SimilarityTransform};

/// Parameters for point-to-plane ICP.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointToPlaneParams {
    /// Maximum number of iterations (default: 100).
    pub max_iterations: u32,
    /// Convergence threshold for RMS error change (default: 1e-6).
    pub convergence_threshold: f64,
    /// Maximum correspondence distance (default: `None`, unbounded).
    pub max_correspondence_distance: Option<f64>,
    /// Neighbourhood size for normal estimation (default: 20).
    pub k_neighbors: usize,
}

impl Default for PointToPlaneParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-6,
            max_correspondence_distance: None,
            k_neighbors: DEFAULT_K_NEIGHBORS,
        }
    }
}

impl PointToPlaneParams {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence threshold.
    #[must_use]
    pub const fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    /// Sets the maximum correspondence distance.
    #[must_use]
    pub const fn with_max_correspondence_distance(mut self, distance: f64) -> Self {
        self.max_correspondence_distance = Some(distance);
        self
    }

    /// Sets the neighbourhood size used for normal estimation.
    #[must_use]
    pub const fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
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

struct PlaneStep {
    normals: Vec<Vector3<f64>>,
}

impl StepSolver for PlaneStep {
    fn step(
        &self,
        _current: &SimilarityTransform,
        moved: &[Point3<f64>],
        pairs: &[Correspondence],
        target: &PointIndex,
    ) -> RegistrationResult<SimilarityTransform> {
        let targets = target.points();
        let mut ata = Matrix6::zeros();
        let mut atb = Vector6::zeros();

        for c in pairs {
            let p = moved[c.source_idx];
            let n = self.normals[c.target_idx];
            let residual = (p - targets[c.target_idx]).dot(&n);
            let arm = p.coords.cross(&n);
            let j = Vector6::new(n.x, n.y, n.z, arm.x, arm.y, arm.z);

            ata += j * j.transpose();
            atb += j * residual;
        }

        let delta = solve_normal_equations(ata, &atb)?;
        Ok(increment_from_twist(&delta))
    }
}

/// Unit normals for every target point, taken from the cloud when complete.
fn target_normals(target: &PointCloud, index: &PointIndex, k: usize) -> Vec<Vector3<f64>> {
    if target.has_normals() {
        return target
            .points
            .iter()
            .map(|p| p.normal.unwrap_or_else(Vector3::z))
            .collect();
    }
    debug!(points = target.len(), k, "estimating target normals");
    estimate_normals(index.points(), index, k)
}

/// Refines `initial` so that `source` lands on `target` with point-to-plane ICP.
///
/// Degenerate geometry (for example a single plane, which leaves in-plane
/// motion unconstrained) ends the run with a `Diverged` status.
#[must_use]
pub fn point_to_plane_align(
    source: &PointCloud,
    target: &PointCloud,
    initial: &SimilarityTransform,
    params: &PointToPlaneParams,
) -> AlignmentOutcome {
    let index = PointIndex::new(&target.positions());
    let step = PlaneStep {
        normals: target_normals(target, &index, params.k_neighbors),
    };
    iterate(
        &source.positions(),
        &index,
        *initial,
        &params.loop_settings(),
        &step,
    )
}
