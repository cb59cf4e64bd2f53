//! Status and result of one alignment run.

use std::fmt;

use nalgebra::Matrix4;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SimilarityTransform;

/// Lifecycle of an alignment run.
///
/// A run starts `NotStarted`, is `Running` while iterating, and ends in one of
/// the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AlignmentStatus {
    /// No iteration has run yet.
    #[default]
    NotStarted,
    /// Iterating.
    Running,
    /// The error change dropped below the convergence threshold.
    Converged,
    /// The iteration cap was hit before convergence.
    MaxIterationsReached,
    /// No correspondences, a singular solve, or a non-finite error.
    Diverged,
}

impl AlignmentStatus {
    /// True for `Converged`, `MaxIterationsReached` and `Diverged`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Converged | Self::MaxIterationsReached | Self::Diverged
        )
    }

    /// True only for `Converged`.
    #[must_use]
    pub const fn is_converged(self) -> bool {
        matches!(self, Self::Converged)
    }
}

impl fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Converged => "converged",
            Self::MaxIterationsReached => "max iterations reached",
            Self::Diverged => "diverged",
        };
        f.write_str(text)
    }
}

/// Result of an alignment strategy.
///
/// Always carries a transform: the latest one on convergence, otherwise the
/// lowest-error transform evaluated during the run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlignmentOutcome {
    /// Source-to-target transform.
    pub transform: SimilarityTransform,
    /// Terminal status.
    pub status: AlignmentStatus,
    /// Iterations performed.
    pub iterations: u32,
    /// RMS correspondence distance of `transform` (infinite if never evaluated).
    pub rms_error: f64,
    /// Correspondences used to evaluate `transform`.
    pub correspondence_count: usize,
}

impl AlignmentOutcome {
    /// The outcome's transform as a 4x4 homogeneous matrix.
    #[must_use]
    pub fn matrix(&self) -> Matrix4<f64> {
        self.transform.to_matrix4()
    }

    /// True if the run converged.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.status.is_converged()
    }
}
