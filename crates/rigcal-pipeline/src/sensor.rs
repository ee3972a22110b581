//! Sensor identities, kinds and the per-kind calibration policy.

use std::fmt;

use rigcal_core::AxisCorrection;
use serde::{Deserialize, Serialize};

/// Stable name of a sensor on the rig (e.g. `"front_laser"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SensorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Closed set of sensor families the rig supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Single-plane scanning range finder.
    PlanarLaser,
    /// Multi-layer 3D lidar.
    MultiLayerLaser,
    /// RGB-D / time-of-flight camera delivering 3D target centres.
    DepthCamera,
    /// 2D camera; observes pixels (and optionally a range-derived 3D centre).
    MonocularCamera,
}

/// How an extrinsic transform was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    /// SVD alignment of two 3D point sets.
    PointSetAlignment,
    /// Deterministic PnP over every correspondence.
    PoseFromPoints,
    /// RANSAC PnP followed by a refit on the consensus set.
    PoseFromPointsRobust,
}

impl EstimationMethod {
    /// Whether the method consumes pixels and camera intrinsics.
    pub fn needs_intrinsics(self) -> bool {
        matches!(
            self,
            EstimationMethod::PoseFromPoints | EstimationMethod::PoseFromPointsRobust
        )
    }
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EstimationMethod::PointSetAlignment => "point_set_alignment",
            EstimationMethod::PoseFromPoints => "pose_from_points",
            EstimationMethod::PoseFromPointsRobust => "pose_from_points_robust",
        };
        f.write_str(name)
    }
}

/// Calibration behaviour attached to a [`SensorKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPolicy {
    /// Takes part in the cross-sensor displacement consistency check.
    pub consistency_check: bool,
    /// Estimators to run, primary first.
    pub estimators: &'static [EstimationMethod],
    /// Re-orientation applied to the estimated pose before it is published.
    pub axis_correction: Option<AxisCorrection>,
}

const ALIGNMENT_ONLY: &[EstimationMethod] = &[EstimationMethod::PointSetAlignment];

const CAMERA_ESTIMATORS: &[EstimationMethod] = &[
    EstimationMethod::PoseFromPointsRobust,
    EstimationMethod::PoseFromPoints,
    EstimationMethod::PointSetAlignment,
];

impl SensorKind {
    pub fn policy(self) -> SensorPolicy {
        match self {
            SensorKind::PlanarLaser | SensorKind::MultiLayerLaser | SensorKind::DepthCamera => {
                SensorPolicy {
                    consistency_check: true,
                    estimators: ALIGNMENT_ONLY,
                    axis_correction: None,
                }
            }
            SensorKind::MonocularCamera => SensorPolicy {
                consistency_check: false,
                estimators: CAMERA_ESTIMATORS,
                axis_correction: Some(AxisCorrection::OpticalToForward),
            },
        }
    }

    /// Whether readings of this kind carry pixels.
    pub fn observes_pixels(self) -> bool {
        matches!(self, SensorKind::MonocularCamera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_policy_prefers_robust_pnp() {
        let policy = SensorKind::MonocularCamera.policy();
        assert!(!policy.consistency_check);
        assert_eq!(
            policy.estimators.first(),
            Some(&EstimationMethod::PoseFromPointsRobust)
        );
        assert_eq!(policy.axis_correction, Some(AxisCorrection::OpticalToForward));
    }

    #[test]
    fn range_sensors_use_alignment() {
        for kind in [
            SensorKind::PlanarLaser,
            SensorKind::MultiLayerLaser,
            SensorKind::DepthCamera,
        ] {
            let policy = kind.policy();
            assert!(policy.consistency_check);
            assert_eq!(policy.estimators, ALIGNMENT_ONLY);
            assert!(policy.axis_correction.is_none());
            assert!(!kind.observes_pixels());
        }
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = SensorId::new("velodyne");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""velodyne""#);
        let kind: SensorKind = serde_json::from_str(r#""multi_layer_laser""#).unwrap();
        assert_eq!(kind, SensorKind::MultiLayerLaser);
        assert_eq!(
            EstimationMethod::PoseFromPointsRobust.to_string(),
            "pose_from_points_robust"
        );
    }
}
