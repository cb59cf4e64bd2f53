//! Error types for the registration pipeline.

use std::fmt;
use std::path::PathBuf;

use cloud_io::IoError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Stage;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Which of the two input clouds an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CloudRole {
    /// The moving cloud.
    Source,
    /// The fixed cloud.
    Target,
}

impl fmt::Display for CloudRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// Fatal pipeline failures.
///
/// Non-convergence is not an error: it is reported through the alignment
/// status and the pipeline continues with the best transform found.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A cloud could not be loaded.
    #[error("failed to load {role} cloud from {}: {source}", path.display())]
    LoadFailure {
        /// Which cloud.
        role: CloudRole,
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// Scale ratio and measurements do not describe a usable scale.
    #[error("invalid scale configuration: {reason}")]
    InvalidScaleConfig {
        /// What was inconsistent.
        reason: String,
    },

    /// A cloud has no points left after voxel filtering.
    #[error("{role} cloud is empty after downsampling with voxel size {voxel_size}")]
    EmptyCloudAfterDownsample {
        /// Which cloud.
        role: CloudRole,
        /// Voxel edge length used.
        voxel_size: f64,
    },

    /// The alignment produced a NaN or infinite transform.
    #[error("alignment produced a non-finite transform")]
    InvalidTransform,

    /// The transformed cloud could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
}

impl PipelineError {
    /// The stage that failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::LoadFailure { .. } => Stage::Loading,
            Self::InvalidScaleConfig { .. } => Stage::ScaleEstimation,
            Self::EmptyCloudAfterDownsample { .. } => Stage::Downsampling,
            Self::InvalidTransform => Stage::Validation,
            Self::WriteFailure { .. } => Stage::Export,
            Self::InvalidConfig { .. } => Stage::Configuration,
        }
    }

    pub(crate) fn invalid_scale(reason: impl Into<String>) -> Self {
        Self::InvalidScaleConfig {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
