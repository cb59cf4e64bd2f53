//! Closed-form transform between paired point sets (Kabsch, with the
//! Umeyama scale extension).

use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};

use crate::{RegistrationError, RegistrationResult, SimilarityTransform};

/// Spread below which the source is treated as a single point and the scale
/// is left at 1.
const MIN_SPREAD: f64 = 1e-10;

/// Least-squares transform taking `source_points[i]` onto `target_points[i]`.
///
/// The rotation comes from the SVD of the centered cross-covariance, with the
/// smallest singular direction flipped when needed so the result is always a
/// proper rotation. With `compute_scale` the Umeyama scale is solved too;
/// without it the scale is fixed at 1.
///
/// # Errors
///
/// [`RegistrationError::EmptySource`] or [`RegistrationError::EmptyTarget`]
/// for empty input, [`RegistrationError::InvalidParameter`] when the lengths
/// differ, and [`RegistrationError::SvdFailed`] if the decomposition does not
/// produce its factors.
///
/// # Example
///
/// ```
/// use cloud_registration::compute_rigid_transform;
/// use nalgebra::{Point3, Vector3};
///
/// let moving = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
/// ];
/// let fixed: Vec<_> = moving.iter().map(|p| p + Vector3::new(-1.0, 0.5, 4.0)).collect();
///
/// let estimate = compute_rigid_transform(&moving, &fixed, false).unwrap();
/// assert!((estimate.transform_point(&moving[1]) - fixed[1]).norm() < 1e-9);
/// ```
pub fn compute_rigid_transform(
    source_points: &[Point3<f64>],
    target_points: &[Point3<f64>],
    compute_scale: bool,
) -> RegistrationResult<SimilarityTransform> {
    check_pairing(source_points, target_points)?;

    let mu_source = mean(source_points);
    let mu_target = mean(target_points);
    let moments = Moments::accumulate(source_points, target_points, &mu_source, &mu_target);

    let svd = moments.cross.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(RegistrationError::SvdFailed);
    };

    // cross = U S V^T, R = U D V^T with D = diag(1, 1, sign(det(U V^T))).
    let d = (u * v_t).determinant().signum();
    let rotation_matrix = u * Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d)) * v_t;
    let rotation =
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation_matrix));

    let scale = if compute_scale && moments.source_spread > MIN_SPREAD {
        let sv = svd.singular_values;
        (sv[0] + sv[1] + d * sv[2]) / moments.source_spread
    } else {
        1.0
    };

    let translation = mu_target - scale * (rotation * mu_source);
    Ok(SimilarityTransform::with_scale(rotation, translation, scale))
}

fn check_pairing(source: &[Point3<f64>], target: &[Point3<f64>]) -> RegistrationResult<()> {
    match (source.len(), target.len()) {
        (0, _) => Err(RegistrationError::EmptySource),
        (_, 0) => Err(RegistrationError::EmptyTarget),
        (a, b) if a != b => Err(RegistrationError::InvalidParameter(format!(
            "paired point sets differ in length ({a} source, {b} target)"
        ))),
        _ => Ok(()),
    }
}

fn mean(points: &[Point3<f64>]) -> Vector3<f64> {
    #[allow(clippy::cast_precision_loss)]
    let count = points.len() as f64;
    points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / count
}

/// Second moments of the centered pairs.
struct Moments {
    /// Sum of `(t - mu_t)(s - mu_s)^T`.
    cross: Matrix3<f64>,
    /// Sum of `|s - mu_s|^2`.
    source_spread: f64,
}

impl Moments {
    fn accumulate(
        source: &[Point3<f64>],
        target: &[Point3<f64>],
        mu_source: &Vector3<f64>,
        mu_target: &Vector3<f64>,
    ) -> Self {
        source.iter().zip(target).fold(
            Self {
                cross: Matrix3::zeros(),
                source_spread: 0.0,
            },
            |mut m, (s, t)| {
                let ds = s.coords - mu_source;
                let dt = t.coords - mu_target;
                m.cross += dt * ds.transpose();
                m.source_spread += ds.norm_squared();
                m
            },
        )
    }
}
