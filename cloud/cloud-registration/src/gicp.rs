//! Generalized ICP (plane-to-plane).
//!
//! Each point is modelled as a thin disc: its neighbourhood covariance with the
//! eigenvalues replaced by `(epsilon, 1, 1)`. A correspondence between moved
//! source point `p` and target point `q` is weighted by
//!
//! ```text
//! W = (C_q + R C_p R^T)^-1
//! ```
//!
//! so that disagreement along the shared surface normal dominates. The
//! Gauss-Newton step linearizes `d = q - p` in a small motion `[v; w]`:
//! `J = [ -I | [p]x ]`, `H = sum J^T W J`, `g = sum J^T W d`, `delta = -H^-1 g`.
//!
//! Covariances are computed once, in each cloud's own frame.

use cloud_types::PointCloud;
use nalgebra::{Matrix3, Matrix3x6, Matrix6, Point3, Vector6};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::correspondence::{Correspondence, PointIndex};
use crate::covariance::{plane_covariances, DEFAULT_K_NEIGHBORS, DEFAULT_PLANE_EPSILON};
use crate::solver::{
    increment_from_twist, iterate, solve_normal_equations, LoopSettings, StepSolver,
};
use crate::{AlignmentOutcome, RegistrationResult, SimilarityTransform};

/// Parameters for generalized ICP.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GicpParams {
    /// Maximum number of iterations (default: 50).
    pub max_iterations: u32,
    /// Convergence threshold for RMS error change (default: 1e-6).
    pub convergence_threshold: f64,
    /// Maximum correspondence distance (default: `None`, unbounded).
    pub max_correspondence_distance: Option<f64>,
    /// Neighbourhood size for covariance estimation (default: 20).
    pub k_neighbors: usize,
    /// Eigenvalue along the normal of each regularized covariance (default: 1e-3).
    pub plane_epsilon: f64,
}

impl Default for GicpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 1e-6,
            max_correspondence_distance: None,
            k_neighbors: DEFAULT_K_NEIGHBORS,
            plane_epsilon: DEFAULT_PLANE_EPSILON,
        }
    }
}

impl GicpParams {
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

    /// Sets the neighbourhood size.
    #[must_use]
    pub const fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    /// Sets the plane regularization epsilon.
    #[must_use]
    pub const fn with_plane_epsilon(mut self, epsilon: f64) -> Self {
        self.plane_epsilon = epsilon;
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

struct PlaneToPlaneStep {
    source_covariances: Vec<Matrix3<f64>>,
    target_covariances: Vec<Matrix3<f64>>,
}

impl StepSolver for PlaneToPlaneStep {
    fn step(
        &self,
        current: &SimilarityTransform,
        moved: &[Point3<f64>],
        pairs: &[Correspondence],
        target: &PointIndex,
    ) -> RegistrationResult<SimilarityTransform> {
        let targets = target.points();
        let r = current.rotation_matrix();
        let mut h = Matrix6::zeros();
        let mut g = Vector6::zeros();

        for c in pairs {
            let combined = self.target_covariances[c.target_idx]
                + r * self.source_covariances[c.source_idx] * r.transpose();
            let Some(weight) = combined.try_inverse() else {
                continue;
            };

            let p = moved[c.source_idx];
            let d = targets[c.target_idx] - p;

            let mut j = Matrix3x6::zeros();
            j.fixed_view_mut::<3, 3>(0, 0)
                .copy_from(&(-Matrix3::identity()));
            j.fixed_view_mut::<3, 3>(0, 3)
                .copy_from(&p.coords.cross_matrix());

            let jt_w = j.transpose() * weight;
            h += jt_w * j;
            g += jt_w * d;
        }

        let delta = solve_normal_equations(h, &g)?;
        Ok(increment_from_twist(&delta))
    }
}

/// Refines `initial` so that `source` lands on `target` with generalized ICP.
#[must_use]
pub fn gicp_align(
    source: &PointCloud,
    target: &PointCloud,
    initial: &SimilarityTransform,
    params: &GicpParams,
) -> AlignmentOutcome {
    let source_points = source.positions();
    let target_index = PointIndex::new(&target.positions());
    let source_index = PointIndex::new(&source_points);

    debug!(
        source = source_points.len(),
        target = target_index.len(),
        k = params.k_neighbors,
        "computing plane covariances"
    );
    let step = PlaneToPlaneStep {
        source_covariances: plane_covariances(
            &source_points,
            &source_index,
            params.k_neighbors,
            params.plane_epsilon,
        ),
        target_covariances: plane_covariances(
            target_index.points(),
            &target_index,
            params.k_neighbors,
            params.plane_epsilon,
        ),
    };

    iterate(
        &source_points,
        &target_index,
        *initial,
        &params.loop_settings(),
        &step,
    )
}
