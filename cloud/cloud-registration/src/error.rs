//! Error types for the low-level registration solvers.
//!
//! Strategies never surface these to callers; a failed solver step ends the
//! run with [`AlignmentStatus::Diverged`](crate::AlignmentStatus::Diverged).

use thiserror::Error;

/// Errors raised by a single solver computation.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Source point set is empty.
    #[error("source point set is empty")]
    EmptySource,

    /// Target point set is empty.
    #[error("target point set is empty")]
    EmptyTarget,

    /// SVD computation failed during transform estimation.
    #[error("SVD computation failed during transform estimation")]
    SvdFailed,

    /// The normal equations of a Gauss-Newton step could not be solved.
    #[error("normal equations are singular")]
    SingularSystem,

    /// No valid correspondences found between the point sets.
    #[error("no valid correspondences found")]
    NoCorrespondences,

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
