//! Shared test data.

use cloud_types::PointCloud;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::SimilarityTransform;

/// Random samples on the surface of an ellipsoid with semi-axes 1.5, 1.0 and
/// 0.6, which has no continuous rotational symmetry.
pub fn ellipsoid(n: usize, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n);
    while points.len() < n {
        let v: Vector3<f64> = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let len = v.norm();
        if !(0.1..=1.0).contains(&len) {
            continue;
        }
        let u = v / len;
        points.push(Point3::new(1.5 * u.x, u.y, 0.6 * u.z));
    }
    PointCloud::from_positions(&points)
}

/// A small rigid motion: 2 degrees about a skewed axis plus a short shift.
pub fn small_motion() -> SimilarityTransform {
    let axis = Vector3::new(0.3, -0.5, 1.0).normalize();
    SimilarityTransform::new(
        UnitQuaternion::from_scaled_axis(axis * 2.0_f64.to_radians()),
        Vector3::new(0.02, -0.01, 0.015),
    )
}

/// Asserts that two transforms agree in rotation, translation and scale.
pub fn assert_close(actual: &SimilarityTransform, expected: &SimilarityTransform, tol: f64) {
    let rotation_error = actual.rotation.angle_to(&expected.rotation);
    assert!(rotation_error < tol, "rotation off by {rotation_error}");
    let translation_error = (actual.translation - expected.translation).norm();
    assert!(translation_error < tol, "translation off by {translation_error}");
    assert!((actual.scale - expected.scale).abs() < tol, "scale {}", actual.scale);
}
