//! Calibration workflow for a multi-sensor rig.
//!
//! Candidate rounds from a [`RoundSource`] pass through the [`ValidityGate`]
//! into a [`CorrespondenceStore`]. Calibration freezes the store, estimates
//! each sensor against the reference sensor according to its
//! [`SensorKind`] policy and collects the results in a [`TransformGraph`].
//! Camera entries are then checked by reprojection. [`CalibrationSession`]
//! owns all of it; [`fusion`] uses the finished graph.
//!
//! See [`session`] for the step functions.

pub mod config;
pub mod fusion;
pub mod gate;
pub mod graph;
pub mod observation;
pub mod sensor;
pub mod session;
pub mod source;
pub mod store;

pub use config::{load_intrinsics, load_json_file, CalibrationConfig, SensorConfig};
pub use gate::{GateConfig, GateDecision, GateHistory, RejectReason, ValidityGate};
pub use graph::{GraphEntry, GraphError, TransformGraph};
pub use observation::{Observation, Reading, RoundCandidate};
pub use sensor::{EstimationMethod, SensorId, SensorKind, SensorPolicy};
pub use session::{
    run_calibration, step_acquire, step_calibrate, step_verify, CalibrationReport,
    CalibrationSession,
};
pub use source::{IterRoundSource, RoundSource};
pub use store::{CorrespondenceSet, CorrespondenceStore};
