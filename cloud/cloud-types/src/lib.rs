//! Point cloud container types.
//!
//! This crate provides the data model shared by the registration crates:
//!
//! - [`CloudPoint`] - A 3D position with optional normal and color
//! - [`PointCloud`] - An ordered collection of points with bounds, centroid
//!   and voxel-grid downsampling
//! - [`Aabb`] - Axis-aligned bounding box
//! - [`PointColor`] - 8-bit RGB color carried through export
//!
//! # Units
//!
//! This library is **unit-agnostic**. All coordinates are `f64`. Source and
//! target clouds may be expressed in different units; the scale ratio used by
//! the registration pipeline converts between them.
//!
//! # Example
//!
//! ```
//! use cloud_types::{PointCloud, Point3};
//!
//! let cloud = PointCloud::from_positions(&[
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.02, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//! ]);
//!
//! let coarse = cloud.downsample(0.5);
//! assert_eq!(coarse.len(), 2);
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod cloud;
mod point;

pub use bounds::Aabb;
pub use cloud::PointCloud;
pub use point::{CloudPoint, PointColor};

pub use nalgebra::{Point3, Vector3};
