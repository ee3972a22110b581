//! Closed-form and iterative estimators for rig extrinsics.
//!
//! - [`RigidTransformEstimator`]: SVD point-set alignment between two 3D sensors.
//! - [`PerspectivePoseEstimator`]: camera pose from 3D reference points and
//!   pixels, deterministic (seeded LM) or robust (RANSAC).
//! - [`ReprojectionVerifier`]: pixel residual of a camera pose.
//!
//! Errors are reported as [`rigcal_core::CalibError`].

pub mod math;
pub mod pnp;
mod reprojection;
mod rigid;

pub use pnp::{PerspectivePoseEstimator, PnpOptions, PoseEstimate, RefineOptions};
pub use reprojection::*;
pub use rigid::*;
