//! The point cloud container.

use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, CloudPoint, PointColor};

/// Points of one scan, in file order.
///
/// Normals and colors live on the individual [`CloudPoint`]s; a cloud is said
/// to carry an attribute only when every point has it.
///
/// ```
/// use cloud_types::{Point3, PointCloud};
///
/// let mut scan: PointCloud = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 2.0)]
///     .into_iter()
///     .collect();
/// scan.push_coords(4.0, 0.0, 0.0);
///
/// assert_eq!(scan.len(), 3);
/// assert!(!scan.has_normals());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointCloud {
    /// Points, in file order.
    pub points: Vec<CloudPoint>,
}

/// Running sums for the points that fall into one voxel.
struct VoxelAccumulator {
    position: Vector3<f64>,
    normal: Vector3<f64>,
    color: [u32; 3],
    count: usize,
    normals: usize,
    colors: usize,
}

impl Default for VoxelAccumulator {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            normal: Vector3::zeros(),
            color: [0; 3],
            count: 0,
            normals: 0,
            colors: 0,
        }
    }
}

impl VoxelAccumulator {
    fn add(&mut self, point: &CloudPoint) {
        self.position += point.position.coords;
        self.count += 1;
        if let Some(normal) = point.normal {
            self.normal += normal;
            self.normals += 1;
        }
        if let Some(color) = point.color {
            self.color[0] += u32::from(color.r);
            self.color[1] += u32::from(color.g);
            self.color[2] += u32::from(color.b);
            self.colors += 1;
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn finish(self) -> CloudPoint {
        let position = Point3::from(self.position / self.count as f64);

        // A voxel only keeps a normal when every member had one.
        let normal = if self.normals == self.count {
            self.normal.try_normalize(f64::EPSILON)
        } else {
            None
        };

        let color = if self.colors == self.count {
            let n = self.colors as u32;
            let avg = |sum: u32| ((sum + n / 2) / n).min(255) as u8;
            Some(PointColor::new(
                avg(self.color[0]),
                avg(self.color[1]),
                avg(self.color[2]),
            ))
        } else {
            None
        };

        CloudPoint {
            position,
            normal,
            color,
        }
    }
}

impl PointCloud {
    /// Empty cloud.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Empty cloud with room for `capacity` points.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity).into()
    }

    /// Attribute-less cloud over `positions`.
    #[must_use]
    pub fn from_positions(positions: &[Point3<f64>]) -> Self {
        positions.iter().copied().collect()
    }

    /// Point count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the cloud has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the cloud is non-empty and every point carries a normal.
    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.all_points(CloudPoint::has_normal)
    }

    /// Whether the cloud is non-empty and every point carries a color.
    #[must_use]
    pub fn has_colors(&self) -> bool {
        self.all_points(CloudPoint::has_color)
    }

    fn all_points(&self, predicate: impl Fn(&CloudPoint) -> bool) -> bool {
        !self.is_empty() && self.points.iter().all(predicate)
    }

    /// Appends a point.
    pub fn push(&mut self, point: CloudPoint) {
        self.points.push(point);
    }

    /// Appends a bare position.
    pub fn push_coords(&mut self, x: f64, y: f64, z: f64) {
        self.push(CloudPoint::from_coords(x, y, z));
    }

    /// Positions only, in point order.
    #[must_use]
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Extents of the cloud, or `None` when it has no points.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        (!self.is_empty()).then(|| Aabb::from_points(self.points.iter().map(|p| &p.position)))
    }

    /// Mean position, or `None` when the cloud has no points.
    ///
    /// ```
    /// use cloud_types::{Point3, PointCloud};
    ///
    /// let pair = PointCloud::from_positions(&[
    ///     Point3::new(-1.0, 3.0, 0.0),
    ///     Point3::new(3.0, 3.0, 0.0),
    /// ]);
    /// assert_eq!(pair.centroid(), Some(Point3::new(1.0, 3.0, 0.0)));
    /// ```
    #[must_use]
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.len() as f64;
        let total = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.position.coords);
        Some(Point3::from(total / count))
    }

    /// Whether no point has a NaN or infinite coordinate.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(CloudPoint::is_finite)
    }

    /// Downsamples the cloud on a uniform voxel grid anchored at the origin.
    ///
    /// Every occupied voxel of edge `voxel_size` is replaced by one point at
    /// the mean position of its members. Normals are averaged and renormalized
    /// when every member has one; colors are averaged the same way.
    ///
    /// The output is ordered by voxel index, so the same input and voxel size
    /// always produce the same cloud. A non-positive or non-finite voxel size
    /// returns an unchanged copy.
    ///
    /// # Example
    ///
    /// ```
    /// use cloud_types::{PointCloud, Point3};
    ///
    /// let positions: Vec<_> = (0..100)
    ///     .map(|i| Point3::new(f64::from(i) * 0.01, 0.0, 0.0))
    ///     .collect();
    /// let cloud = PointCloud::from_positions(&positions);
    ///
    /// let downsampled = cloud.downsample(0.1);
    /// assert!(downsampled.len() < cloud.len());
    /// assert_eq!(cloud.downsample(0.0).len(), cloud.len());
    /// ```
    #[must_use]
    pub fn downsample(&self, voxel_size: f64) -> Self {
        if self.points.is_empty() || !voxel_size.is_finite() || voxel_size <= 0.0 {
            return self.clone();
        }

        let mut voxels: BTreeMap<(i64, i64, i64), VoxelAccumulator> = BTreeMap::new();

        for point in &self.points {
            voxels
                .entry(voxel_key(&point.position, voxel_size))
                .or_default()
                .add(point);
        }

        voxels.into_values().map(VoxelAccumulator::finish).collect()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn voxel_key(position: &Point3<f64>, voxel_size: f64) -> (i64, i64, i64) {
    (
        (position.x / voxel_size).floor() as i64,
        (position.y / voxel_size).floor() as i64,
        (position.z / voxel_size).floor() as i64,
    )
}

impl From<Vec<CloudPoint>> for PointCloud {
    fn from(points: Vec<CloudPoint>) -> Self {
        Self { points }
    }
}

impl FromIterator<CloudPoint> for PointCloud {
    fn from_iter<I: IntoIterator<Item = CloudPoint>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl FromIterator<Point3<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        iter.into_iter().map(CloudPoint::new).collect()
    }
}
