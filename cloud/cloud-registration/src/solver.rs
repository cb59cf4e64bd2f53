//! The iteration loop shared by every alignment method.
//!
//! Each iteration moves the source by the current estimate, pairs every moved
//! point with its nearest target point, scores the pairing by RMS distance and
//! asks the method for an increment that is composed on the left.

use nalgebra::{Matrix6, Point3, UnitQuaternion, Vector3, Vector6};
use tracing::{debug, trace};

use crate::correspondence::{rms_error, Correspondence, PointIndex};
use crate::{
    AlignmentOutcome, AlignmentStatus, RegistrationError, RegistrationResult, SimilarityTransform,
};

/// Loop limits common to all methods.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopSettings {
    pub max_iterations: u32,
    pub convergence_threshold: f64,
    pub max_correspondence_distance: Option<f64>,
}

/// One method's update rule.
pub(crate) trait StepSolver {
    /// Computes the increment that improves `current`.
    ///
    /// `moved` is the source already transformed by `current`.
    fn step(
        &self,
        current: &SimilarityTransform,
        moved: &[Point3<f64>],
        pairs: &[Correspondence],
        target: &PointIndex,
    ) -> RegistrationResult<SimilarityTransform>;
}

#[derive(Clone, Copy)]
struct Scored {
    transform: SimilarityTransform,
    rms: f64,
    pairs: usize,
}

/// Runs `solver` from `initial` until convergence, divergence or the
/// iteration cap.
pub(crate) fn iterate<S: StepSolver>(
    source: &[Point3<f64>],
    target: &PointIndex,
    initial: SimilarityTransform,
    settings: &LoopSettings,
    solver: &S,
) -> AlignmentOutcome {
    let unscored = Scored {
        transform: initial,
        rms: f64::INFINITY,
        pairs: 0,
    };

    if source.is_empty() || target.is_empty() {
        debug!("alignment skipped: empty point set");
        return outcome(unscored, AlignmentStatus::Diverged, 0);
    }

    let max_dist_sq = settings
        .max_correspondence_distance
        .map_or(f64::INFINITY, |d| d * d);

    let mut status = AlignmentStatus::Running;
    let mut current = initial;
    let mut best = unscored;
    let mut latest = unscored;
    let mut previous_rms = f64::INFINITY;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        iterations += 1;

        let moved = move_points(source, &current);
        let pairs = target.correspondences(&moved, max_dist_sq);
        let rms = rms_error(&pairs);

        if pairs.is_empty() || !rms.is_finite() {
            debug!(iteration = iterations, "no usable correspondences");
            status = AlignmentStatus::Diverged;
            break;
        }

        latest = Scored {
            transform: current,
            rms,
            pairs: pairs.len(),
        };
        if rms < best.rms {
            best = latest;
        }
        trace!(iteration = iterations, rms, pairs = pairs.len(), "icp iteration");

        if rms <= f64::EPSILON || (previous_rms - rms).abs() < settings.convergence_threshold {
            status = AlignmentStatus::Converged;
            break;
        }
        previous_rms = rms;

        match solver.step(&current, &moved, &pairs, target) {
            Ok(increment) => {
                let next = increment.compose(&current);
                if !next.is_finite() {
                    debug!(iteration = iterations, "increment produced a non-finite pose");
                    status = AlignmentStatus::Diverged;
                    break;
                }
                current = next;
            }
            Err(err) => {
                debug!(iteration = iterations, error = %err, "solver step failed");
                status = AlignmentStatus::Diverged;
                break;
            }
        }
    }

    if status == AlignmentStatus::Running {
        // Score the last increment too.
        let moved = move_points(source, &current);
        let pairs = target.correspondences(&moved, max_dist_sq);
        let rms = rms_error(&pairs);
        if rms < best.rms {
            best = Scored {
                transform: current,
                rms,
                pairs: pairs.len(),
            };
        }
        status = AlignmentStatus::MaxIterationsReached;
    }

    let chosen = if status.is_converged() { latest } else { best };
    debug!(%status, iterations, rms = chosen.rms, "alignment finished");
    outcome(chosen, status, iterations)
}

fn outcome(scored: Scored, status: AlignmentStatus, iterations: u32) -> AlignmentOutcome {
    AlignmentOutcome {
        transform: scored.transform,
        status,
        iterations,
        rms_error: scored.rms,
        correspondence_count: scored.pairs,
    }
}

fn move_points(points: &[Point3<f64>], transform: &SimilarityTransform) -> Vec<Point3<f64>> {
    points.iter().map(|p| transform.transform_point(p)).collect()
}

/// Rigid increment for a small motion `[v; w]`: rotation by the scaled axis
/// `w` followed by translation `v`.
pub(crate) fn increment_from_twist(delta: &Vector6<f64>) -> SimilarityTransform {
    let translation = Vector3::new(delta[0], delta[1], delta[2]);
    let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(delta[3], delta[4], delta[5]));
    SimilarityTransform::new(rotation, translation)
}

/// Solves `h * delta = -g` for a Gauss-Newton step.
pub(crate) fn solve_normal_equations(
    h: Matrix6<f64>,
    g: &Vector6<f64>,
) -> RegistrationResult<Vector6<f64>> {
    let delta = h
        .cholesky()
        .ok_or(RegistrationError::SingularSystem)?
        .solve(&(-g));
    if delta.iter().all(|v| v.is_finite()) {
        Ok(delta)
    } else {
        Err(RegistrationError::SingularSystem)
    }
}
