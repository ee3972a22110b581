//! Error type shared by the estimators.

use thiserror::Error;

use crate::Real;

/// Errors raised by a single estimation attempt.
///
/// Every variant is local to the sensor being calibrated: callers record the
/// failure and move on to the next sensor.
#[derive(Debug, Error)]
pub enum CalibError {
    /// Fewer correspondences than the estimator's minimum.
    #[error("need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    /// Paired inputs have different lengths.
    #[error("correspondence sets differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Rank-deficient geometry (collinear/coincident points, singular matrices).
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(String),

    /// A rotation block is not proper orthonormal.
    #[error("rotation is not a proper rotation (det = {det:.6})")]
    ImproperRotation { det: Real },

    /// RANSAC exhausted its budget without a consensus set.
    #[error("ransac failed to find a consensus solution")]
    NoConsensus,

    /// Camera intrinsics could not be obtained.
    #[error("camera intrinsics unavailable: {0}")]
    IntrinsicsUnavailable(String),
}

impl CalibError {
    /// Shorthand for [`CalibError::DegenerateConfiguration`].
    pub fn degenerate(msg: impl Into<String>) -> Self {
        CalibError::DegenerateConfiguration(msg.into())
    }
}

/// Result alias for estimator code.
pub type CalibResult<T> = Result<T, CalibError>;
