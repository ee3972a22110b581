//! Intermediate results held by a [`CalibrationSession`](super::CalibrationSession).

use serde::{Deserialize, Serialize};

use crate::graph::TransformGraph;
use crate::store::{CorrespondenceSet, CorrespondenceStore};

use super::report::{SensorEstimates, VerificationRecord};

/// Session workspace, filled step by step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Rounds accepted so far.
    pub store: CorrespondenceStore,
    /// Snapshot taken when calibration starts; acquisition is closed once set.
    pub correspondences: Option<CorrespondenceSet>,
    pub graph: Option<TransformGraph>,
    /// Per-sensor estimator results, configuration order.
    pub estimates: Vec<SensorEstimates>,
    pub verification: Option<Vec<VerificationRecord>>,
}

impl CalibrationState {
    pub fn has_rounds(&self) -> bool {
        !self.store.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.correspondences.is_some()
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    pub fn has_verification(&self) -> bool {
        self.verification.is_some()
    }

    /// Drop estimation results, keeping the acquired and frozen rounds.
    pub fn clear_calibration(&mut self) {
        self.graph = None;
        self.estimates.clear();
        self.verification = None;
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
