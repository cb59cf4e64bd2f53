//! Single points and their optional attributes.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 8-bit RGB color, as stored in PLY `red`/`green`/`blue` properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointColor {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl PointColor {
    /// Color from its channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One sample of a scan: a position plus whatever attributes the file had.
///
/// ```
/// use cloud_types::{CloudPoint, Point3, PointColor, Vector3};
///
/// let sample = CloudPoint::new(Point3::new(0.5, 0.0, -1.0))
///     .with_normal(Vector3::y())
///     .with_color(PointColor::new(200, 10, 10));
///
/// assert!(sample.has_normal() && sample.has_color());
/// assert!(!CloudPoint::from_coords(1.0, 2.0, 3.0).has_normal());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CloudPoint {
    /// Location in the cloud's frame.
    pub position: Point3<f64>,

    /// Surface normal, unit length when present.
    pub normal: Option<Vector3<f64>>,

    /// Color, when the source file had one.
    pub color: Option<PointColor>,
}

impl CloudPoint {
    /// Bare point at `position`.
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
            color: None,
        }
    }

    /// Bare point at `(x, y, z)`.
    #[must_use]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Attaches a normal.
    #[must_use]
    pub fn with_normal(mut self, normal: Vector3<f64>) -> Self {
        self.normal = Some(normal);
        self
    }

    /// Attaches a color.
    #[must_use]
    pub fn with_color(mut self, color: PointColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Whether a normal is attached.
    #[must_use]
    pub const fn has_normal(&self) -> bool {
        self.normal.is_some()
    }

    /// Whether a color is attached.
    #[must_use]
    pub const fn has_color(&self) -> bool {
        self.color.is_some()
    }

    /// Whether the position has no NaN or infinite coordinate.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().copied().all(f64::is_finite)
    }
}

impl Default for CloudPoint {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

impl From<Point3<f64>> for CloudPoint {
    fn from(position: Point3<f64>) -> Self {
        Self::new(position)
    }
}
