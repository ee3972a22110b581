//! Session configuration and file loading.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use rigcal_core::{CalibError, CameraIntrinsics, Mat3, Real};
use rigcal_linear::PnpOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::gate::{GateConfig, ValidityGate};
use crate::sensor::{SensorId, SensorKind, SensorPolicy};

/// One sensor on the rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: SensorId,
    pub kind: SensorKind,
}

/// Configuration of a calibration session.
///
/// ```json
/// {
///   "reference": "laser",
///   "sensors": [
///     { "id": "laser", "kind": "planar_laser" },
///     { "id": "velodyne", "kind": "multi_layer_laser" },
///     { "id": "camera", "kind": "monocular_camera" }
///   ],
///   "gate": { "min_displacement": 0.1, "max_displacement_deviation": 0.15 },
///   "target_rounds": 15
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Sensor whose frame all transforms are expressed in.
    pub reference: SensorId,
    /// Every sensor on the rig, reference included.
    pub sensors: Vec<SensorConfig>,
    #[serde(default)]
    pub gate: GateConfig,
    /// Acquisition stops once this many rounds are accepted.
    #[serde(default = "default_target_rounds")]
    pub target_rounds: usize,
    #[serde(default)]
    pub pnp: PnpOptions,
    /// Reprojection norm (pixels) above which a camera estimate is flagged.
    #[serde(default = "default_max_reprojection_error")]
    pub max_reprojection_error: Real,
}

fn default_target_rounds() -> usize {
    15
}

fn default_max_reprojection_error() -> Real {
    10.0
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let reference = SensorId::new("reference");
        Self {
            sensors: vec![SensorConfig {
                id: reference.clone(),
                kind: SensorKind::PlanarLaser,
            }],
            reference,
            gate: GateConfig::default(),
            target_rounds: default_target_rounds(),
            pnp: PnpOptions::default(),
            max_reprojection_error: default_max_reprojection_error(),
        }
    }
}

impl CalibrationConfig {
    /// Check ids, the reference sensor and thresholds.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for s in &self.sensors {
            ensure!(seen.insert(&s.id), "sensor {} is listed twice", s.id);
        }
        let Some(reference_kind) = self.kind_of(&self.reference) else {
            bail!("reference sensor {} is not in the sensor list", self.reference);
        };
        ensure!(
            !reference_kind.observes_pixels(),
            "reference sensor {} must report 3D points",
            self.reference
        );
        ensure!(
            self.gate.min_displacement >= 0.0 && self.gate.max_displacement_deviation >= 0.0,
            "gate thresholds must be non-negative"
        );
        ensure!(self.target_rounds > 0, "target_rounds must be positive");
        ensure!(
            self.max_reprojection_error > 0.0,
            "max_reprojection_error must be positive"
        );
        Ok(())
    }

    pub fn kind_of(&self, sensor: &SensorId) -> Option<SensorKind> {
        self.sensors
            .iter()
            .find(|s| s.id == *sensor)
            .map(|s| s.kind)
    }

    pub fn policy_of(&self, sensor: &SensorId) -> Option<SensorPolicy> {
        self.kind_of(sensor).map(SensorKind::policy)
    }

    /// Sensors to calibrate, in configuration order.
    pub fn targets(&self) -> impl Iterator<Item = &SensorConfig> {
        self.sensors.iter().filter(|s| s.id != self.reference)
    }

    /// Whether any configured estimator needs camera intrinsics.
    pub fn needs_intrinsics(&self) -> bool {
        self.targets().any(|s| {
            s.kind
                .policy()
                .estimators
                .iter()
                .any(|m| m.needs_intrinsics())
        })
    }

    pub fn gate(&self) -> ValidityGate {
        ValidityGate::new(
            self.gate.clone(),
            self.reference.clone(),
            self.sensors.iter().map(|s| (s.id.clone(), s.kind)).collect(),
        )
    }
}

/// Read and deserialize a JSON file.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("failed to parse {}", path.display()))
}

/// Accepted layouts of an intrinsics file.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntrinsicsFile {
    Params(CameraIntrinsics),
    /// Row-major `K` and OpenCV-ordered coefficients, as published by camera
    /// drivers.
    Matrix {
        camera_matrix: [[Real; 3]; 3],
        #[serde(default)]
        distortion_coefficients: Vec<Real>,
    },
}

/// Load and validate camera intrinsics, either as [`CameraIntrinsics`] JSON
/// or as `{ "camera_matrix": [[..]; 3], "distortion_coefficients": [..] }`.
///
/// Every failure is reported as [`CalibError::IntrinsicsUnavailable`].
pub fn load_intrinsics(path: &Path) -> Result<CameraIntrinsics> {
    let file: IntrinsicsFile = load_json_file(path)
        .map_err(|err| CalibError::IntrinsicsUnavailable(format!("{err:#}")))?;
    let intrinsics = match file {
        IntrinsicsFile::Params(intrinsics) => intrinsics,
        IntrinsicsFile::Matrix {
            camera_matrix: m,
            distortion_coefficients,
        } => CameraIntrinsics::from_matrix(
            &Mat3::from_fn(|r, c| m[r][c]),
            &distortion_coefficients,
        )
        .with_context(|| format!("invalid intrinsics in {}", path.display()))?,
    };
    intrinsics
        .validate()
        .with_context(|| format!("invalid intrinsics in {}", path.display()))?;
    Ok(intrinsics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn rig_config() -> CalibrationConfig {
        serde_json::from_str(
            r#"{
                "reference": "laser",
                "sensors": [
                    { "id": "laser", "kind": "planar_laser" },
                    { "id": "velodyne", "kind": "multi_layer_laser" },
                    { "id": "camera", "kind": "monocular_camera" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = rig_config();
        cfg.validate().unwrap();
        assert_eq!(cfg.target_rounds, 15);
        assert_eq!(cfg.gate, GateConfig::default());
        assert_eq!(cfg.pnp.ransac.max_iters, 1000);
        assert!(cfg.needs_intrinsics());
        let targets: Vec<&str> = cfg.targets().map(|s| s.id.as_str()).collect();
        assert_eq!(targets, ["velodyne", "camera"]);
        CalibrationConfig::default().validate().unwrap();
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut cfg = rig_config();
        cfg.reference = SensorId::new("camera");
        assert!(cfg.validate().unwrap_err().to_string().contains("3D points"));

        let mut cfg = rig_config();
        cfg.reference = SensorId::new("radar");
        assert!(cfg.validate().is_err());

        let mut cfg = rig_config();
        cfg.sensors.push(cfg.sensors[1].clone());
        assert!(cfg.validate().unwrap_err().to_string().contains("twice"));
    }

    #[test]
    fn intrinsics_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "k": {{ "fx": 525.0, "fy": 525.0, "cx": 319.5, "cy": 239.5, "skew": 0.0 }} }}"#
        )
        .unwrap();
        let intr = load_intrinsics(file.path()).unwrap();
        assert_eq!(intr.k.fx, 525.0);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "camera_matrix": [[600.0, 0.0, 320.0], [0.0, 602.0, 240.0], [0.0, 0.0, 1.0]],
                 "distortion_coefficients": [-0.1, 0.02, 0.0, 0.0, 0.0] }}"#
        )
        .unwrap();
        let intr = load_intrinsics(file.path()).unwrap();
        assert_eq!((intr.k.fx, intr.k.fy, intr.k.cx), (600.0, 602.0, 320.0));
        assert!(matches!(
            intr.distortion,
            rigcal_core::DistortionParams::BrownConrady5 { .. }
        ));
    }

    #[test]
    fn missing_intrinsics_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_intrinsics(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalibError>(),
            Some(CalibError::IntrinsicsUnavailable(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "k": {{ "fx": -1.0, "fy": 525.0, "cx": 319.5, "cy": 239.5, "skew": 0.0 }} }}"#
        )
        .unwrap();
        let err = load_intrinsics(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalibError>(),
            Some(CalibError::IntrinsicsUnavailable(_))
        ));
    }
}
