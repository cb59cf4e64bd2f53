//! Method selection and the common strategy interface.

use std::fmt;
use std::str::FromStr;

use cloud_types::PointCloud;
use nalgebra::{UnitQuaternion, Vector3};
use thiserror::Error;
use tracing::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gicp::{gicp_align, GicpParams};
use crate::icp::{icp_align, IcpParams};
use crate::point_to_plane::{point_to_plane_align, PointToPlaneParams};
use crate::{AlignmentOutcome, SimilarityTransform};

/// Fine-alignment algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AlignmentMethod {
    /// Generalized (plane-to-plane) ICP.
    #[default]
    Gicp,
    /// Point-to-point ICP.
    Icp,
    /// Point-to-plane ICP.
    IcpNormals,
}

impl AlignmentMethod {
    /// Every method, in display order.
    pub const ALL: [Self; 3] = [Self::Gicp, Self::Icp, Self::IcpNormals];

    /// Canonical upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gicp => "GICP",
            Self::Icp => "ICP",
            Self::IcpNormals => "ICP_NORMALS",
        }
    }
}

impl fmt::Display for AlignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown alignment method '{name}' (expected GICP, ICP or ICP_NORMALS)")]
pub struct ParseMethodError {
    /// The rejected input.
    pub name: String,
}

impl FromStr for AlignmentMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseMethodError {
                name: s.to_string(),
            })
    }
}

/// Anything that can refine the alignment of two clouds.
///
/// Implementations never fail; a failed run is reported through
/// [`AlignmentOutcome::status`].
pub trait AlignmentStrategy {
    /// Aligns `source` onto `target`, starting from the centroid-matching
    /// estimate at `initial_scale`.
    fn align(&self, source: &PointCloud, target: &PointCloud, initial_scale: f64)
        -> AlignmentOutcome;
}

/// Starting pose: scale the source about the origin, then move its centroid
/// onto the target centroid.
///
/// Falls back to a pure scale when either cloud is empty.
#[must_use]
pub fn initial_estimate(
    source: &PointCloud,
    target: &PointCloud,
    scale: f64,
) -> SimilarityTransform {
    let translation = match (source.centroid(), target.centroid()) {
        (Some(s), Some(t)) => t.coords - s.coords * scale,
        _ => Vector3::zeros(),
    };
    SimilarityTransform::with_scale(UnitQuaternion::identity(), translation, scale)
}

/// A configured alignment method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Aligner {
    /// Generalized ICP.
    Gicp(GicpParams),
    /// Point-to-point ICP.
    Icp(IcpParams),
    /// Point-to-plane ICP.
    IcpNormals(PointToPlaneParams),
}

impl Default for Aligner {
    fn default() -> Self {
        Self::from_method(AlignmentMethod::default())
    }
}

impl From<AlignmentMethod> for Aligner {
    fn from(method: AlignmentMethod) -> Self {
        Self::from_method(method)
    }
}

impl Aligner {
    /// The method with its default parameters.
    #[must_use]
    pub fn from_method(method: AlignmentMethod) -> Self {
        match method {
            AlignmentMethod::Gicp => Self::Gicp(GicpParams::default()),
            AlignmentMethod::Icp => Self::Icp(IcpParams::default()),
            AlignmentMethod::IcpNormals => Self::IcpNormals(PointToPlaneParams::default()),
        }
    }

    /// Which method this is.
    #[must_use]
    pub const fn method(&self) -> AlignmentMethod {
        match self {
            Self::Gicp(_) => AlignmentMethod::Gicp,
            Self::Icp(_) => AlignmentMethod::Icp,
            Self::IcpNormals(_) => AlignmentMethod::IcpNormals,
        }
    }

    /// Overrides the iteration cap.
    #[must_use]
    pub fn with_max_iterations(self, max_iterations: u32) -> Self {
        match self {
            Self::Gicp(p) => Self::Gicp(p.with_max_iterations(max_iterations)),
            Self::Icp(p) => Self::Icp(p.with_max_iterations(max_iterations)),
            Self::IcpNormals(p) => Self::IcpNormals(p.with_max_iterations(max_iterations)),
        }
    }

    /// Overrides the correspondence rejection distance.
    #[must_use]
    pub fn with_max_correspondence_distance(self, distance: f64) -> Self {
        match self {
            Self::Gicp(p) => Self::Gicp(p.with_max_correspondence_distance(distance)),
            Self::Icp(p) => Self::Icp(p.with_max_correspondence_distance(distance)),
            Self::IcpNormals(p) => {
                Self::IcpNormals(p.with_max_correspondence_distance(distance))
            }
        }
    }

    /// Runs the method from an explicit starting pose.
    #[must_use]
    pub fn align_from(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        initial: &SimilarityTransform,
    ) -> AlignmentOutcome {
        match self {
            Self::Gicp(p) => gicp_align(source, target, initial, p),
            Self::Icp(p) => icp_align(source, target, initial, p),
            Self::IcpNormals(p) => point_to_plane_align(source, target, initial, p),
        }
    }
}

impl AlignmentStrategy for Aligner {
    fn align(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        initial_scale: f64,
    ) -> AlignmentOutcome {
        let initial = initial_estimate(source, target, initial_scale);
        info!(
            method = %self.method(),
            source = source.len(),
            target = target.len(),
            initial_scale,
            "aligning clouds"
        );
        let outcome = self.align_from(source, target, &initial);
        info!(
            status = %outcome.status,
            iterations = outcome.iterations,
            rms = outcome.rms_error,
            "alignment done"
        );
        outcome
    }
}
