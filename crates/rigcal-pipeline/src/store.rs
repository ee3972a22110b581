//! Accumulation of accepted rounds into index-aligned correspondence sets.

use rigcal_core::{Pt2, Pt3};
use serde::{Deserialize, Serialize};

use crate::gate::{GateDecision, GateHistory, ValidityGate};
use crate::observation::RoundCandidate;
use crate::sensor::SensorId;

/// Growing list of accepted rounds.
///
/// Round `i` of every sensor refers to the same physical target position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrespondenceStore {
    rounds: Vec<RoundCandidate>,
    history: GateHistory,
}

impl CorrespondenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn history(&self) -> &GateHistory {
        &self.history
    }

    pub fn rounds(&self) -> &[RoundCandidate] {
        &self.rounds
    }

    /// Run `candidate` through `gate` and append it when accepted.
    pub fn offer(&mut self, gate: &ValidityGate, candidate: RoundCandidate) -> GateDecision {
        let decision = gate.evaluate(&candidate, &self.history);
        if decision.is_accepted() {
            self.push(candidate);
        }
        decision
    }

    /// Append a round without gating.
    pub fn push(&mut self, round: RoundCandidate) {
        self.history.record(&round);
        self.rounds.push(round);
    }

    /// Snapshot of the rounds collected so far.
    pub fn freeze(&self) -> CorrespondenceSet {
        CorrespondenceSet {
            rounds: self.rounds.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
        self.history.clear();
    }
}

/// Read-only correspondence set used during estimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceSet {
    rounds: Vec<RoundCandidate>,
}

impl CorrespondenceSet {
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[RoundCandidate] {
        &self.rounds
    }

    /// 3D points of `sensor` in round order; `None` if any round lacks one.
    pub fn points(&self, sensor: &SensorId) -> Option<Vec<Pt3>> {
        self.rounds.iter().map(|r| r.point(sensor)).collect()
    }

    /// Pixels of `sensor` in round order; `None` if any round lacks one.
    pub fn pixels(&self, sensor: &SensorId) -> Option<Vec<Pt2>> {
        self.rounds.iter().map(|r| r.pixel(sensor)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateConfig;
    use crate::sensor::SensorKind;

    fn gate() -> ValidityGate {
        ValidityGate::new(
            GateConfig::default(),
            SensorId::new("ref"),
            vec![
                (SensorId::new("ref"), SensorKind::PlanarLaser),
                (SensorId::new("cam"), SensorKind::MonocularCamera),
            ],
        )
    }

    fn round(x: f64) -> RoundCandidate {
        RoundCandidate::new()
            .with_point("ref", Pt3::new(x, 0.0, 0.5))
            .with_pixel("cam", Pt2::new(100.0 * x, 240.0))
    }

    #[test]
    fn only_accepted_rounds_are_stored() {
        let g = gate();
        let mut store = CorrespondenceStore::new();
        assert!(store.offer(&g, round(1.0)).is_accepted());
        assert!(!store.offer(&g, round(1.05)).is_accepted());
        assert!(store.offer(&g, round(1.5)).is_accepted());
        assert_eq!(store.len(), 2);
        assert_eq!(store.history().accepted(), 2);
        assert_eq!(
            store.history().previous(&SensorId::new("ref")),
            Some(Pt3::new(1.5, 0.0, 0.5))
        );
    }

    #[test]
    fn frozen_set_is_index_aligned() {
        let g = gate();
        let mut store = CorrespondenceStore::new();
        for x in [1.0, 2.0, 3.0] {
            store.offer(&g, round(x));
        }
        let set = store.freeze();
        let pts = set.points(&SensorId::new("ref")).unwrap();
        let px = set.pixels(&SensorId::new("cam")).unwrap();
        assert_eq!(pts.len(), 3);
        assert_eq!(px.len(), 3);
        for (p, q) in pts.iter().zip(&px) {
            assert!((q.x - 100.0 * p.x).abs() < 1e-12);
        }
        // Pixel-only sensors have no 3D points.
        assert!(set.points(&SensorId::new("cam")).is_none());

        // Further growth does not affect the snapshot.
        store.offer(&g, round(4.0));
        assert_eq!(set.len(), 3);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn clear_resets_history() {
        let mut store = CorrespondenceStore::new();
        store.push(round(1.0));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.history().accepted(), 0);
    }
}
