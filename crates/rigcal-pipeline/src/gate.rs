//! Acceptance test for candidate sampling rounds.
//!
//! A round is usable when every configured sensor detected the target, the
//! target moved far enough since the last accepted round (measured by the
//! reference sensor), and the sensors that take part in the consistency check
//! agree with the reference on how far it moved.

use std::collections::BTreeMap;
use std::fmt;

use rigcal_core::{Pt3, Real};
use serde::{Deserialize, Serialize};

use crate::observation::RoundCandidate;
use crate::sensor::{SensorId, SensorKind};

/// Thresholds of the [`ValidityGate`]. Distances are in sensor units (metres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum reference displacement since the last accepted round.
    pub min_displacement: Real,
    /// Maximum mean squared difference between each sensor's displacement and
    /// the reference displacement.
    pub max_displacement_deviation: Real,
    /// Maximum spread between a reading's stamp and the reference stamp.
    pub max_stamp_skew: Option<Real>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_displacement: 0.10,
            max_displacement_deviation: 0.15,
            max_stamp_skew: None,
        }
    }
}

/// Last accepted target position per sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateHistory {
    previous: BTreeMap<SensorId, Pt3>,
    accepted: usize,
}

impl GateHistory {
    /// Number of rounds recorded so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Last accepted point of `sensor`.
    pub fn previous(&self, sensor: &SensorId) -> Option<Pt3> {
        self.previous.get(sensor).copied()
    }

    /// Record an accepted round.
    pub fn record(&mut self, round: &RoundCandidate) {
        for (sensor, reading) in &round.readings {
            if let Some(p) = reading.observation.point() {
                self.previous.insert(sensor.clone(), p);
            }
        }
        self.accepted += 1;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Why a round was turned down.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// A configured sensor has no reading in the round.
    MissingSensor(SensorId),
    /// A sensor reported the zero "no detection" value.
    MissingDetection(SensorId),
    /// A sensor reading lacks the component its kind requires.
    WrongObservation(SensorId),
    /// Readings were taken too far apart in time.
    StampSkew { sensor: SensorId, skew: Real },
    /// The target did not move far enough.
    TooClose { displacement: Real },
    /// Sensors disagree on how far the target moved.
    Inconsistent { deviation: Real },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingSensor(id) => write!(f, "no reading from {id}"),
            RejectReason::MissingDetection(id) => write!(f, "{id} did not detect the target"),
            RejectReason::WrongObservation(id) => {
                write!(f, "{id} reported an observation of the wrong type")
            }
            RejectReason::StampSkew { sensor, skew } => {
                write!(f, "{sensor} reading is {skew:.3} s away from the reference")
            }
            RejectReason::TooClose { displacement } => {
                write!(f, "target moved only {displacement:.3}")
            }
            RejectReason::Inconsistent { deviation } => {
                write!(f, "displacement deviation {deviation:.4} between sensors")
            }
        }
    }
}

/// Outcome of [`ValidityGate::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Accepted {
        /// Reference displacement since the previous accepted round.
        displacement: Real,
        /// Consistency deviation; `None` on the first round.
        deviation: Option<Real>,
    },
    Rejected(RejectReason),
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted { .. })
    }
}

/// Pure accept/reject decision for candidate rounds.
#[derive(Debug, Clone)]
pub struct ValidityGate {
    config: GateConfig,
    reference: SensorId,
    sensors: Vec<(SensorId, SensorKind)>,
}

impl ValidityGate {
    /// `sensors` lists every sensor that must report in a round, reference
    /// included.
    pub fn new(config: GateConfig, reference: SensorId, sensors: Vec<(SensorId, SensorKind)>) -> Self {
        Self {
            config,
            reference,
            sensors,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Shorthand for `evaluate(..).is_accepted()`.
    pub fn accept(&self, candidate: &RoundCandidate, history: &GateHistory) -> bool {
        self.evaluate(candidate, history).is_accepted()
    }

    /// Decide whether `candidate` may be appended after the rounds in
    /// `history`. Does not touch `history`.
    pub fn evaluate(&self, candidate: &RoundCandidate, history: &GateHistory) -> GateDecision {
        match self.check(candidate, history) {
            Ok((displacement, deviation)) => GateDecision::Accepted {
                displacement,
                deviation,
            },
            Err(reason) => {
                log::debug!("gate: rejected round: {reason}");
                GateDecision::Rejected(reason)
            }
        }
    }

    fn check(
        &self,
        candidate: &RoundCandidate,
        history: &GateHistory,
    ) -> Result<(Real, Option<Real>), RejectReason> {
        for (sensor, kind) in &self.sensors {
            let reading = candidate
                .get(sensor)
                .ok_or_else(|| RejectReason::MissingSensor(sensor.clone()))?;
            let obs = &reading.observation;
            let usable = if kind.observes_pixels() {
                obs.pixel().is_some()
            } else {
                obs.point().is_some()
            };
            if !usable {
                return Err(RejectReason::WrongObservation(sensor.clone()));
            }
            if obs.is_missing() {
                return Err(RejectReason::MissingDetection(sensor.clone()));
            }
        }

        self.check_stamps(candidate)?;

        let reference_point = candidate
            .point(&self.reference)
            .ok_or_else(|| RejectReason::WrongObservation(self.reference.clone()))?;
        let previous = history
            .previous(&self.reference)
            .unwrap_or_else(Pt3::origin);
        let displacement = (reference_point - previous).norm();
        if displacement <= self.config.min_displacement {
            return Err(RejectReason::TooClose { displacement });
        }

        if history.accepted() == 0 {
            return Ok((displacement, None));
        }

        let diffs: Vec<Real> = self
            .sensors
            .iter()
            .filter(|(id, kind)| *id != self.reference && kind.policy().consistency_check)
            .filter_map(|(id, _)| {
                let now = candidate.point(id)?;
                let before = history.previous(id)?;
                let d = (now - before).norm() - displacement;
                Some(d * d)
            })
            .collect();
        if diffs.is_empty() {
            return Ok((displacement, None));
        }

        let deviation = diffs.iter().sum::<Real>() / diffs.len() as Real;
        if deviation > self.config.max_displacement_deviation {
            return Err(RejectReason::Inconsistent { deviation });
        }
        Ok((displacement, Some(deviation)))
    }

    fn check_stamps(&self, candidate: &RoundCandidate) -> Result<(), RejectReason> {
        let Some(ref_stamp) = candidate.get(&self.reference).and_then(|r| r.stamp) else {
            return Ok(());
        };
        let worst = self
            .sensors
            .iter()
            .filter_map(|(id, _)| {
                let stamp = candidate.get(id)?.stamp?;
                Some((id, (stamp - ref_stamp).abs()))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((sensor, skew)) = worst else {
            return Ok(());
        };
        log::debug!("gate: largest stamp skew {skew:.4} s ({sensor})");
        match self.config.max_stamp_skew {
            Some(limit) if skew > limit => Err(RejectReason::StampSkew {
                sensor: sensor.clone(),
                skew,
            }),
            _ => Ok(()),
        }
    }
}
