//! Per-sensor readings and candidate sampling rounds.

use std::collections::BTreeMap;

use rigcal_core::{Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

use crate::sensor::SensorId;

/// What a sensor reported for the target at one sampling instant.
///
/// An all-zero component means "no detection".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Observation {
    /// Target centre in the sensor frame.
    Point { point: Pt3 },
    /// Target centre in the image.
    Pixel { pixel: Pt2 },
    /// Image centre plus a 3D centre derived from the apparent target radius.
    Camera { point: Pt3, pixel: Pt2 },
}

impl Observation {
    pub fn point(&self) -> Option<Pt3> {
        match *self {
            Observation::Point { point } | Observation::Camera { point, .. } => Some(point),
            Observation::Pixel { .. } => None,
        }
    }

    pub fn pixel(&self) -> Option<Pt2> {
        match *self {
            Observation::Pixel { pixel } | Observation::Camera { pixel, .. } => Some(pixel),
            Observation::Point { .. } => None,
        }
    }

    /// True when any component is the zero sentinel or not finite.
    pub fn is_missing(&self) -> bool {
        self.point().is_some_and(|p| is_sentinel(p.coords.as_slice()))
            || self.pixel().is_some_and(|p| is_sentinel(p.coords.as_slice()))
    }
}

fn is_sentinel(values: &[Real]) -> bool {
    values.iter().all(|&v| v == 0.0) || values.iter().any(|v| !v.is_finite())
}

/// One observation with its acquisition time (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub observation: Observation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<Real>,
}

impl Reading {
    pub fn new(observation: Observation) -> Self {
        Self {
            observation,
            stamp: None,
        }
    }

    pub fn with_stamp(mut self, stamp: Real) -> Self {
        self.stamp = Some(stamp);
        self
    }
}

/// Readings of every sensor for one proposed sampling round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundCandidate {
    pub readings: BTreeMap<SensorId, Reading>,
}

impl RoundCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sensor: impl Into<SensorId>, reading: Reading) -> Option<Reading> {
        self.readings.insert(sensor.into(), reading)
    }

    pub fn with_point(mut self, sensor: impl Into<SensorId>, point: Pt3) -> Self {
        self.insert(sensor, Reading::new(Observation::Point { point }));
        self
    }

    pub fn with_pixel(mut self, sensor: impl Into<SensorId>, pixel: Pt2) -> Self {
        self.insert(sensor, Reading::new(Observation::Pixel { pixel }));
        self
    }

    pub fn with_camera(mut self, sensor: impl Into<SensorId>, point: Pt3, pixel: Pt2) -> Self {
        self.insert(sensor, Reading::new(Observation::Camera { point, pixel }));
        self
    }

    pub fn get(&self, sensor: &SensorId) -> Option<&Reading> {
        self.readings.get(sensor)
    }

    pub fn point(&self, sensor: &SensorId) -> Option<Pt3> {
        self.get(sensor).and_then(|r| r.observation.point())
    }

    pub fn pixel(&self, sensor: &SensorId) -> Option<Pt2> {
        self.get(sensor).and_then(|r| r.observation.pixel())
    }
}
