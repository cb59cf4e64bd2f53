//! Fine alignment of point clouds.
//!
//! This crate refines a coarse pose between two clouds into a similarity
//! transform (rotation, translation and uniform scale):
//!
//! - **GICP** - plane-to-plane generalized ICP, the default
//! - **ICP** - point-to-point ICP with a Kabsch update
//! - **ICP with normals** - point-to-plane ICP with a Gauss-Newton update
//!
//! Every method shares one iteration loop and returns an
//! [`AlignmentOutcome`] instead of failing: a run that cannot make progress
//! ends as [`AlignmentStatus::Diverged`] and reports the best transform it saw.
//! The scale is fixed by the initial estimate; only rotation and translation
//! are refined.
//!
//! # Quick Start
//!
//! ```
//! use cloud_registration::{Aligner, AlignmentMethod, AlignmentStrategy};
//! use cloud_types::{PointCloud, Point3};
//!
//! let source = PointCloud::from_positions(&[
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.1, 0.0),
//!     Point3::new(0.1, 1.0, 0.2),
//!     Point3::new(0.3, 0.2, 1.0),
//!     Point3::new(0.9, 0.8, 0.7),
//! ]);
//! let target: PointCloud = source
//!     .points
//!     .iter()
//!     .map(|p| Point3::new(p.position.x * 2.0 + 5.0, p.position.y * 2.0, p.position.z * 2.0))
//!     .collect();
//!
//! let aligner = Aligner::from_method(AlignmentMethod::Icp);
//! let outcome = aligner.align(&source, &target, 2.0);
//!
//! assert!(outcome.converged());
//! assert!((outcome.transform.translation.x - 5.0).abs() < 1e-9);
//! ```
//!
//! # Method Selection
//!
//! | Scenario | Method |
//! |----------|--------|
//! | Scanned surfaces, different samplings | `GICP` |
//! | Same sampling, small offset | `ICP` |
//! | Target with reliable normals | `ICP_NORMALS` |
//! | Noisy scans with outliers | any, with `max_correspondence_distance` |
//!
//! Nearest-neighbour queries use a KD-tree. Exactly planar, axis-aligned grids
//! of more than 32 points per coordinate value overflow its buckets and should
//! be voxel-filtered first.

#![warn(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod correspondence;
pub mod covariance;
mod error;
mod gicp;
mod icp;
mod kabsch;
mod method;
mod outcome;
mod point_to_plane;
mod solver;
mod transform;

#[cfg(test)]
mod fixtures;

pub use correspondence::{rms_error, Correspondence, PointIndex};
pub use error::{RegistrationError, RegistrationResult};
pub use gicp::{gicp_align, GicpParams};
pub use icp::{icp_align, IcpParams};
pub use kabsch::compute_rigid_transform;
pub use method::{initial_estimate, Aligner, AlignmentMethod, AlignmentStrategy, ParseMethodError};
pub use outcome::{AlignmentOutcome, AlignmentStatus};
pub use point_to_plane::{point_to_plane_align, PointToPlaneParams};
pub use transform::SimilarityTransform;
