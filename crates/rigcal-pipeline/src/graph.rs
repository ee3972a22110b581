//! Rig transform graph: one pose per sensor relative to the reference sensor.

use std::collections::BTreeMap;

use rigcal_core::transform;
use rigcal_core::{AxisCorrection, Iso3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sensor::{EstimationMethod, SensorId};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("sensor {0} already has a transform")]
    Duplicate(SensorId),
    #[error("the reference sensor {0} is fixed at identity")]
    Reference(SensorId),
    #[error("no transform for sensor {0}")]
    Unknown(SensorId),
}

/// A calibrated sensor pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub sensor: SensorId,
    /// `T_R_S` as estimated, in the sensor's native frame.
    pub ref_se3_sensor: Iso3,
    pub method: EstimationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_correction: Option<AxisCorrection>,
}

impl GraphEntry {
    /// The published pose: `ref_se3_sensor` with the axis correction applied.
    pub fn corrected(&self) -> Iso3 {
        match &self.axis_correction {
            Some(c) => c.apply(&self.ref_se3_sensor),
            None => self.ref_se3_sensor,
        }
    }
}

/// Write-once map from sensor to `T_R_S`.
///
/// The reference sensor is implicit and always resolves to identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformGraph {
    reference: SensorId,
    entries: BTreeMap<SensorId, GraphEntry>,
}

impl TransformGraph {
    pub fn new(reference: SensorId) -> Self {
        Self {
            reference,
            entries: BTreeMap::new(),
        }
    }

    pub fn reference(&self) -> &SensorId {
        &self.reference
    }

    /// Store the pose of `sensor`. Entries are never overwritten.
    pub fn set(
        &mut self,
        sensor: SensorId,
        ref_se3_sensor: Iso3,
        method: EstimationMethod,
        axis_correction: Option<AxisCorrection>,
    ) -> Result<(), GraphError> {
        if sensor == self.reference {
            return Err(GraphError::Reference(sensor));
        }
        if self.entries.contains_key(&sensor) {
            return Err(GraphError::Duplicate(sensor));
        }
        log::info!("graph: {sensor} <- {method}");
        self.entries.insert(
            sensor.clone(),
            GraphEntry {
                sensor,
                ref_se3_sensor,
                method,
                axis_correction,
            },
        );
        Ok(())
    }

    /// Published `T_R_S` (axis correction applied); identity for the
    /// reference.
    pub fn get(&self, sensor: &SensorId) -> Result<Iso3, GraphError> {
        if *sensor == self.reference {
            return Ok(Iso3::identity());
        }
        self.entry(sensor).map(GraphEntry::corrected)
    }

    /// `T_R_S` in the frame the sensor reports its measurements in.
    pub fn native(&self, sensor: &SensorId) -> Result<Iso3, GraphError> {
        if *sensor == self.reference {
            return Ok(Iso3::identity());
        }
        self.entry(sensor).map(|e| e.ref_se3_sensor)
    }

    pub fn entry(&self, sensor: &SensorId) -> Result<&GraphEntry, GraphError> {
        self.entries
            .get(sensor)
            .ok_or_else(|| GraphError::Unknown(sensor.clone()))
    }

    pub fn contains(&self, sensor: &SensorId) -> bool {
        *sensor == self.reference || self.entries.contains_key(sensor)
    }

    pub fn entries(&self) -> impl Iterator<Item = &GraphEntry> {
        self.entries.values()
    }

    /// Number of non-reference entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invert(t: &Iso3) -> Iso3 {
        transform::invert(t)
    }

    /// `b` applied after `a`.
    pub fn compose(a: &Iso3, b: &Iso3) -> Iso3 {
        transform::compose(a, b)
    }

    /// `T_target_source` between two sensors, routed through the reference,
    /// using native frames.
    pub fn relative(&self, target: &SensorId, source: &SensorId) -> Result<Iso3, GraphError> {
        let ref_se3_source = self.native(source)?;
        let ref_se3_target = self.native(target)?;
        Ok(Self::compose(&ref_se3_source, &Self::invert(&ref_se3_target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigcal_core::synthetic::rig::sensor_pose;
    use rigcal_core::transform::pose_error;
    use rigcal_core::Pt3;

    fn graph() -> TransformGraph {
        let mut g = TransformGraph::new(SensorId::new("ref"));
        g.set(
            SensorId::new("lidar"),
            sensor_pose([0.0, 0.1, 0.4], [0.5, -0.2, 0.3]),
            EstimationMethod::PointSetAlignment,
            None,
        )
        .unwrap();
        g.set(
            SensorId::new("cam"),
            sensor_pose([-1.6, 0.0, -1.5], [0.1, 0.0, 0.2]),
            EstimationMethod::PoseFromPointsRobust,
            Some(AxisCorrection::OpticalToForward),
        )
        .unwrap();
        g
    }

    #[test]
    fn reference_is_identity_and_read_only() {
        let mut g = graph();
        let id = SensorId::new("ref");
        assert_eq!(g.get(&id).unwrap(), Iso3::identity());
        assert!(g.contains(&id));
        assert_eq!(
            g.set(id.clone(), Iso3::identity(), EstimationMethod::PointSetAlignment, None),
            Err(GraphError::Reference(id))
        );
    }

    #[test]
    fn entries_are_write_once() {
        let mut g = graph();
        let err = g
            .set(
                SensorId::new("lidar"),
                Iso3::identity(),
                EstimationMethod::PointSetAlignment,
                None,
            )
            .unwrap_err();
        assert_eq!(err, GraphError::Duplicate(SensorId::new("lidar")));
        assert_ne!(g.get(&SensorId::new("lidar")).unwrap(), Iso3::identity());
        assert_eq!(
            g.get(&SensorId::new("radar")),
            Err(GraphError::Unknown(SensorId::new("radar")))
        );
    }

    #[test]
    fn correction_only_affects_published_pose() {
        let g = graph();
        let cam = SensorId::new("cam");
        let native = g.native(&cam).unwrap();
        let published = g.get(&cam).unwrap();
        assert_eq!(
            published,
            AxisCorrection::OpticalToForward.apply(&native)
        );
        let (dt, _) = pose_error(&native, &published);
        assert!(dt < 1e-12);
        let lidar = SensorId::new("lidar");
        assert_eq!(g.get(&lidar).unwrap(), g.native(&lidar).unwrap());
    }

    #[test]
    fn relative_transform_chains_through_reference() {
        let g = graph();
        let lidar = SensorId::new("lidar");
        let cam = SensorId::new("cam");
        let cam_se3_lidar = g.relative(&cam, &lidar).unwrap();

        let p_lidar = Pt3::new(2.0, 0.3, -0.1);
        let p_ref = g.native(&lidar).unwrap().transform_point(&p_lidar);
        let expected = g.native(&cam).unwrap().inverse().transform_point(&p_ref);
        assert!((cam_se3_lidar.transform_point(&p_lidar) - expected).norm() < 1e-12);

        let back = TransformGraph::compose(&cam_se3_lidar, &g.relative(&lidar, &cam).unwrap());
        let (dt, ang) = pose_error(&back, &Iso3::identity());
        assert!(dt < 1e-12 && ang < 1e-12);
    }

    #[test]
    fn graph_json_roundtrip() {
        let g = graph();
        let json = serde_json::to_string(&g).unwrap();
        let back: TransformGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        let (dt, ang) = pose_error(
            &back.get(&SensorId::new("cam")).unwrap(),
            &g.get(&SensorId::new("cam")).unwrap(),
        );
        assert!(dt < 1e-12 && ang < 1e-12);
    }
}
