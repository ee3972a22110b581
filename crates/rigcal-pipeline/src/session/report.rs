//! Serializable calibration results.

use rigcal_core::transform::{from_matrix4, to_matrix4};
use rigcal_core::{AxisCorrection, CalibResult, Iso3, Mat4, Real};
use serde::{Deserialize, Serialize};

use crate::graph::TransformGraph;
use crate::sensor::{EstimationMethod, SensorId, SensorKind};

/// A rigid transform in exchange form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    /// Unit quaternion `[x, y, z, w]`.
    pub quaternion: [Real; 4],
    pub translation: [Real; 3],
    /// Homogeneous matrix, row-major.
    pub matrix: [[Real; 4]; 4],
}

impl TransformRecord {
    pub fn from_iso(t: &Iso3) -> Self {
        let q = t.rotation.quaternion();
        let v = t.translation.vector;
        let m = to_matrix4(t);
        Self {
            quaternion: [q.i, q.j, q.k, q.w],
            translation: [v.x, v.y, v.z],
            matrix: std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)])),
        }
    }

    /// Rebuild the transform from the matrix, checking it is a proper rigid
    /// transform.
    pub fn to_iso(&self) -> CalibResult<Iso3> {
        let m = Mat4::from_fn(|r, c| self.matrix[r][c]);
        from_matrix4(&m)
    }
}

/// Fit quality of one estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimateQuality {
    /// Point-set alignment residual, in metres.
    Alignment {
        rms: Real,
        max: Real,
        reflection_corrected: bool,
    },
    /// Pixel reprojection residual over all correspondences. `None` when a
    /// point falls behind the camera.
    Reprojection {
        norm: Option<Real>,
        rms: Option<Real>,
        inliers: usize,
        total: usize,
        exceeds_limit: bool,
    },
}

/// One successful estimator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub method: EstimationMethod,
    /// `T_R_S` in the sensor's native frame.
    pub ref_se3_sensor: TransformRecord,
    pub quality: EstimateQuality,
}

/// One failed estimator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateFailure {
    pub method: EstimationMethod,
    pub error: String,
}

/// Everything computed for one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEstimates {
    pub sensor: SensorId,
    pub kind: SensorKind,
    /// Method whose estimate went into the graph.
    pub selected: Option<EstimationMethod>,
    pub estimates: Vec<EstimateRecord>,
    pub failures: Vec<EstimateFailure>,
}

impl SensorEstimates {
    pub fn estimate(&self, method: EstimationMethod) -> Option<&EstimateRecord> {
        self.estimates.iter().find(|e| e.method == method)
    }
}

/// Reprojection check of a camera's graph entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub sensor: SensorId,
    pub points: usize,
    pub norm: Option<Real>,
    pub rms: Option<Real>,
    pub max: Option<Real>,
    pub high_reprojection_error: bool,
}

/// Published transform of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub sensor: SensorId,
    pub method: EstimationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_correction: Option<AxisCorrection>,
    /// `T_R_S` with the axis correction applied.
    pub ref_se3_sensor: TransformRecord,
}

/// Final output of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub reference: SensorId,
    pub rounds: usize,
    pub transforms: Vec<GraphRecord>,
    pub sensors: Vec<SensorEstimates>,
    #[serde(default)]
    pub verification: Vec<VerificationRecord>,
    #[serde(default)]
    pub high_reprojection_error: bool,
}

impl CalibrationReport {
    pub(crate) fn new(graph: &TransformGraph, rounds: usize, sensors: Vec<SensorEstimates>) -> Self {
        let transforms = graph
            .entries()
            .map(|e| GraphRecord {
                sensor: e.sensor.clone(),
                method: e.method,
                axis_correction: e.axis_correction,
                ref_se3_sensor: TransformRecord::from_iso(&e.corrected()),
            })
            .collect();
        Self {
            reference: graph.reference().clone(),
            rounds,
            transforms,
            sensors,
            verification: Vec::new(),
            high_reprojection_error: false,
        }
    }

    pub fn transform(&self, sensor: &SensorId) -> Option<&GraphRecord> {
        self.transforms.iter().find(|t| t.sensor == *sensor)
    }

    pub fn sensor(&self, sensor: &SensorId) -> Option<&SensorEstimates> {
        self.sensors.iter().find(|s| s.sensor == *sensor)
    }
}

/// `Some(x)` for finite values; JSON has no representation for infinities.
pub(crate) fn finite(x: Real) -> Option<Real> {
    x.is_finite().then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigcal_core::synthetic::rig::sensor_pose;
    use rigcal_core::transform::pose_error;

    #[test]
    fn transform_record_layouts_agree() {
        let t = sensor_pose([0.3, -0.1, 1.2], [1.0, 2.0, 3.0]);
        let rec = TransformRecord::from_iso(&t);
        assert_eq!(rec.translation, [1.0, 2.0, 3.0]);
        assert_eq!(rec.matrix[0][3], 1.0);
        assert_eq!(rec.matrix[2][3], 3.0);
        assert_eq!(rec.matrix[3], [0.0, 0.0, 0.0, 1.0]);
        let qn: Real = rec.quaternion.iter().map(|v| v * v).sum();
        assert!((qn - 1.0).abs() < 1e-12);

        let back = rec.to_iso().unwrap();
        let (dt, ang) = pose_error(&t, &back);
        assert!(dt < 1e-12 && ang < 1e-9);
    }

    #[test]
    fn infinite_residuals_serialize_as_null() {
        let q = EstimateQuality::Reprojection {
            norm: finite(Real::INFINITY),
            rms: finite(2.0),
            inliers: 4,
            total: 5,
            exceeds_limit: true,
        };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains(r#""norm":null"#), "{json}");
        let back: EstimateQuality = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
