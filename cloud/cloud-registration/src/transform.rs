//! The source-to-target transform produced by registration.

use std::fmt;

use cloud_types::PointCloud;
use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Uniform scale, then rotation, then translation: `p' = s R p + t`.
///
/// As a homogeneous matrix this is `[sR | t; 0 0 0 1]`, which is what gets
/// printed and written to reports.
///
/// ```
/// use cloud_registration::SimilarityTransform;
/// use nalgebra::{Point3, UnitQuaternion, Vector3};
/// use std::f64::consts::PI;
///
/// let half_turn = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
/// let t = SimilarityTransform::with_scale(half_turn, Vector3::new(0.0, 0.0, 5.0), 0.5);
///
/// let p = t.transform_point(&Point3::new(2.0, 2.0, 2.0));
/// assert!((p - Point3::new(1.0, -1.0, 4.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimilarityTransform {
    /// Rotation `R`.
    pub rotation: UnitQuaternion<f64>,
    /// Translation `t`, applied last.
    pub translation: Vector3<f64>,
    /// Uniform scale `s`; 1 for a rigid transform.
    pub scale: f64,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SimilarityTransform {
    /// Rigid transform.
    #[must_use]
    pub const fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self::with_scale(rotation, translation, 1.0)
    }

    /// Similarity with an explicit scale.
    #[must_use]
    pub const fn with_scale(
        rotation: UnitQuaternion<f64>,
        translation: Vector3<f64>,
        scale: f64,
    ) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    /// The transform that leaves every point in place.
    #[must_use]
    pub fn identity() -> Self {
        Self::from_scale(1.0)
    }

    /// Shift by `translation`, nothing else.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::new(UnitQuaternion::identity(), translation)
    }

    /// Scaling about the origin, nothing else.
    #[must_use]
    pub fn from_scale(scale: f64) -> Self {
        Self::with_scale(UnitQuaternion::identity(), Vector3::zeros(), scale)
    }

    /// `s R p + t`.
    #[must_use]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * (self.scale * point.coords) + self.translation)
    }

    /// `self ∘ other`: applies `other`, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        let translation = self.transform_point(&Point3::from(other.translation)).coords;
        Self::with_scale(
            self.rotation * other.rotation,
            translation,
            self.scale * other.scale,
        )
    }

    /// `R` as a matrix, without the scale.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        *self.rotation.to_rotation_matrix().matrix()
    }

    /// Homogeneous `[sR | t; 0 0 0 1]`.
    #[must_use]
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.translation)
            * (self.rotation_matrix() * self.scale).to_homogeneous()
    }

    /// Whether scale, translation and rotation are all free of NaN and
    /// infinities.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        std::iter::once(&self.scale)
            .chain(self.translation.iter())
            .chain(self.rotation.coords.iter())
            .all(|v| v.is_finite())
    }

    /// Whether the transform moves nothing by more than `epsilon`, measured
    /// as rotation angle, translation length and scale offset.
    #[must_use]
    pub fn is_identity(&self, epsilon: f64) -> bool {
        [
            self.rotation.angle(),
            self.translation.norm(),
            (self.scale - 1.0).abs(),
        ]
        .iter()
        .all(|&d| d < epsilon)
    }

    /// Moves every point of `cloud` into the target frame.
    ///
    /// Normals are rotated only, so they stay unit length. Colors are
    /// untouched.
    #[must_use]
    pub fn apply_to_cloud(&self, cloud: &PointCloud) -> PointCloud {
        cloud
            .points
            .iter()
            .map(|point| {
                let mut moved = point.clone();
                moved.position = self.transform_point(&point.position);
                moved.normal = point.normal.map(|n| self.rotation * n);
                moved
            })
            .collect()
    }
}

/// Four rows of the homogeneous matrix, six decimals each.
impl fmt::Display for SimilarityTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self
            .to_matrix4()
            .row_iter()
            .map(|row| {
                row.iter()
                    .map(|v| format!("{v:>14.6}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        f.write_str(&rows.join("\n"))
    }
}
