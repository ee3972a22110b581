//! High-level entry crate for `rigcal`: extrinsic calibration of a rig of
//! laser scanners, depth sensors and cameras against one reference sensor.
//!
//! A spherical target is moved through the shared field of view. Each
//! *round* records its centre as seen by every sensor (3D points for range
//! sensors, pixels for cameras). Rounds are screened by a validity gate,
//! stored, and then every sensor is registered to the reference:
//!
//! - 3D sensors by SVD point-set alignment,
//! - cameras by perspective-n-point, deterministic or RANSAC.
//!
//! The results form a transform graph rooted at the reference sensor.
//!
//! ## Session API
//!
//! ```no_run
//! use rigcal::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config: CalibrationConfig = load_json_file("rig.json".as_ref())?;
//! let rounds: Vec<RoundCandidate> = load_json_file("rounds.json".as_ref())?;
//!
//! let mut session = CalibrationSession::new(config)?;
//! session.set_intrinsics(load_intrinsics("camera.json".as_ref())?)?;
//!
//! let report = run_calibration(&mut session, &mut IterRoundSource::new(rounds))?;
//! for t in &report.transforms {
//!     println!("{}: {:?}", t.sensor, t.ref_se3_sensor.translation);
//! }
//!
//! // Checkpoint; `CalibrationSession::from_json` restores it.
//! std::fs::write("session.json", session.to_json()?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Building blocks
//!
//! ```no_run
//! use rigcal::core::Pt3;
//! use rigcal::linear::RigidTransformEstimator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let in_lidar: Vec<Pt3> = /* target centres seen by the lidar */
//! # vec![];
//! let in_reference: Vec<Pt3> = /* the same centres seen by the reference */
//! # vec![];
//! let fit = RigidTransformEstimator::estimate(&in_lidar, &in_reference)?;
//! println!("T_R_L = {:?}, rms {:.4} m", fit.target_se3_source, fit.rms);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`session`]**: Calibration session and step functions
//! - **[`pipeline`]**: Gate, store, graph, configuration and fusion helpers
//! - **[`core`]**: Math types, camera models, transforms, RANSAC
//! - **[`linear`]**: Point-set alignment, PnP and reprojection checks
//! - **[`prelude`]**: Convenient re-exports for common use cases

/// Calibration session: state, checkpointing and step functions.
pub mod session {
    pub use rigcal_pipeline::session::*;
}

/// Acquisition, graph and configuration types.
pub mod pipeline {
    pub use rigcal_pipeline::*;
}

/// Core math types, camera models, transforms and RANSAC primitives.
pub mod core {
    pub use rigcal_core::*;
}

/// Closed-form and iterative estimators.
pub mod linear {
    pub use rigcal_linear::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use rigcal::prelude::*;`.
pub mod prelude {
    pub use crate::core::{
        AxisCorrection, CalibError, CalibResult, CameraIntrinsics, DistortionParams,
        FxFyCxCySkew, Iso3, Pt2, Pt3, Real,
    };

    pub use crate::linear::{
        PerspectivePoseEstimator, PnpOptions, ReprojectionVerifier, RigidTransformEstimator,
    };

    pub use crate::pipeline::{
        load_intrinsics, load_json_file, CalibrationConfig, EstimationMethod, GateConfig,
        IterRoundSource, RoundCandidate, RoundSource, SensorConfig, SensorId, SensorKind,
        TransformGraph, ValidityGate,
    };

    pub use crate::session::{
        run_calibration, step_acquire, step_calibrate, step_verify, CalibrationReport,
        CalibrationSession,
    };
}
