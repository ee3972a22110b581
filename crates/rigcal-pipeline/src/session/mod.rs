//! Calibration session: config, intrinsics, acquired rounds, results.
//!
//! The session is a mutable container; step functions advance it:
//!
//! ```no_run
//! use rigcal_pipeline::session::{step_acquire, step_calibrate, step_verify, CalibrationSession};
//! use rigcal_pipeline::{CalibrationConfig, IterRoundSource};
//! # fn main() -> anyhow::Result<()> {
//! # let config: CalibrationConfig = unimplemented!();
//! # let rounds: Vec<rigcal_pipeline::RoundCandidate> = unimplemented!();
//! let mut session = CalibrationSession::new(config)?;
//! step_acquire(&mut session, &mut IterRoundSource::new(rounds))?;
//! step_calibrate(&mut session)?;
//! step_verify(&mut session)?;
//! println!("{}", serde_json::to_string_pretty(session.require_report()?)?);
//! # Ok(())
//! # }
//! ```

mod report;
mod state;
mod steps;
mod types;

use anyhow::{bail, Result};
use rigcal_core::{CalibError, CalibResult, CameraIntrinsics};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;

pub use report::*;
pub use state::CalibrationState;
pub use steps::{run_calibration, step_acquire, step_calibrate, step_verify, AcquireSummary};
pub use types::{current_timestamp, LogEntry, SessionMetadata, StepOutcome};

const PROBLEM_TYPE: &str = "rig_extrinsics";
const SCHEMA_VERSION: u32 = 1;

/// State of one calibration run, serializable for checkpointing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSession {
    pub metadata: SessionMetadata,
    config: CalibrationConfig,
    #[serde(default)]
    intrinsics: Option<CameraIntrinsics>,
    pub state: CalibrationState,
    #[serde(default)]
    report: Option<CalibrationReport>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl CalibrationSession {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            metadata: SessionMetadata::new(PROBLEM_TYPE, SCHEMA_VERSION),
            config,
            intrinsics: None,
            state: CalibrationState::default(),
            report: None,
            log: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Replace the configuration. Acquired rounds and results no longer
    /// match it, so they are discarded.
    pub fn set_config(&mut self, config: CalibrationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.state.clear();
        self.report = None;
        self.metadata.touch();
        Ok(())
    }

    pub fn intrinsics(&self) -> Option<&CameraIntrinsics> {
        self.intrinsics.as_ref()
    }

    /// Install camera intrinsics; clears calibration results computed without
    /// them.
    pub fn set_intrinsics(&mut self, intrinsics: CameraIntrinsics) -> CalibResult<()> {
        intrinsics.validate()?;
        self.intrinsics = Some(intrinsics);
        self.state.clear_calibration();
        self.report = None;
        self.metadata.touch();
        Ok(())
    }

    pub fn require_intrinsics(&self) -> CalibResult<&CameraIntrinsics> {
        self.intrinsics
            .as_ref()
            .ok_or_else(|| CalibError::IntrinsicsUnavailable("no intrinsics loaded".into()))
    }

    pub fn report(&self) -> Option<&CalibrationReport> {
        self.report.as_ref()
    }

    pub fn require_report(&self) -> Result<&CalibrationReport> {
        self.report
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("calibration has not been run"))
    }

    pub(crate) fn report_mut(&mut self) -> Option<&mut CalibrationReport> {
        self.report.as_mut()
    }

    pub(crate) fn set_report(&mut self, report: CalibrationReport) {
        self.report = Some(report);
        self.metadata.touch();
    }

    pub fn log_success(&mut self, step: impl Into<String>, summary: impl Into<String>) {
        self.log.push(LogEntry::done(step, summary));
        self.metadata.touch();
    }

    pub fn log_failure(&mut self, step: impl Into<String>, error: impl Into<String>) {
        self.log.push(LogEntry::failed(step, error));
        self.metadata.touch();
    }

    /// Discard results but keep the acquired rounds, so calibration can be
    /// re-run on the same data.
    pub fn reset_calibration(&mut self) {
        self.state.clear_calibration();
        self.report = None;
        self.metadata.touch();
    }

    /// Discard rounds, results and log; keep config and intrinsics.
    pub fn reset(&mut self) {
        self.state.clear();
        self.report = None;
        self.log.clear();
        self.metadata.touch();
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// # Errors
    ///
    /// Fails on malformed JSON, a foreign problem type or a newer schema.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)?;
        if session.metadata.problem_type != PROBLEM_TYPE {
            bail!(
                "session holds a {} problem, expected {PROBLEM_TYPE}",
                session.metadata.problem_type
            );
        }
        if session.metadata.schema_version > SCHEMA_VERSION {
            bail!(
                "session schema version {} is newer than supported version {SCHEMA_VERSION}",
                session.metadata.schema_version
            );
        }
        session.config.validate()?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::RoundCandidate;
    use rigcal_core::{FxFyCxCySkew, Pt3};

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::pinhole(FxFyCxCySkew {
            fx: 600.0,
            fy: 600.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        })
    }

    #[test]
    fn new_session_is_empty() {
        let session = CalibrationSession::new(CalibrationConfig::default())
            .unwrap()
            .with_description("bench rig");
        assert_eq!(session.metadata.problem_type, "rig_extrinsics");
        assert_eq!(session.metadata.description.as_deref(), Some("bench rig"));
        assert!(session.report().is_none());
        assert!(session.require_report().is_err());
        assert!(matches!(
            session.require_intrinsics(),
            Err(CalibError::IntrinsicsUnavailable(_))
        ));
        assert!(!session.state.has_rounds());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = CalibrationConfig::default();
        cfg.sensors.clear();
        assert!(CalibrationSession::new(cfg.clone()).is_err());

        let mut session = CalibrationSession::new(CalibrationConfig::default()).unwrap();
        assert!(session.set_config(cfg).is_err());
    }

    #[test]
    fn reset_keeps_config_and_intrinsics() {
        let mut session = CalibrationSession::new(CalibrationConfig::default()).unwrap();
        session.set_intrinsics(intrinsics()).unwrap();
        session
            .state
            .store
            .push(RoundCandidate::new().with_point("reference", Pt3::new(1.0, 0.0, 0.0)));
        session.log_success("acquire", "1 round");

        session.reset();
        assert!(!session.state.has_rounds());
        assert!(session.log.is_empty());
        assert!(session.intrinsics().is_some());
        assert_eq!(session.config(), &CalibrationConfig::default());
    }

    #[test]
    fn json_roundtrip_and_schema_check() {
        let mut session = CalibrationSession::new(CalibrationConfig::default()).unwrap();
        session.set_intrinsics(intrinsics()).unwrap();
        session
            .state
            .store
            .push(RoundCandidate::new().with_point("reference", Pt3::new(1.0, 0.0, 0.0)));
        let json = session.to_json().unwrap();

        let restored = CalibrationSession::from_json(&json).unwrap();
        assert_eq!(restored.state.store.len(), 1);
        assert_eq!(restored.intrinsics(), session.intrinsics());

        let mut newer = session.clone();
        newer.metadata.schema_version = SCHEMA_VERSION + 1;
        let err = CalibrationSession::from_json(&newer.to_json().unwrap()).unwrap_err();
        assert!(err.to_string().contains("newer"));
    }
}
