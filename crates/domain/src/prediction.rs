//! Prediction — a candidate lighting action derived from one pattern.
//!
//! Predictions are ephemeral: produced by one predictor tick and consumed
//! within it. Only actionable ones ever reach the automation coordinator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, PatternId};
use crate::pattern::PatternKind;
use crate::state::{AttributeValue, Transition};
use crate::time::Timestamp;

/// Set `attribute` of `device_id` to `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub device_id: DeviceId,
    pub attribute: String,
    pub value: AttributeValue,
}

impl Action {
    /// The action that makes `device_id` reach `transition`.
    #[must_use]
    pub fn reach(device_id: DeviceId, transition: &Transition) -> Self {
        Self {
            device_id,
            attribute: transition.attribute.clone(),
            value: transition.value.clone(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}={}", self.device_id, self.attribute, self.value)
    }
}

/// When the predicted action applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Urgency {
    /// Applies right now.
    Now,
    /// Applies until `deadline`, after which the prediction is stale.
    Before { deadline: Timestamp },
    /// Informational only; never executed.
    Advisory,
}

/// A candidate action with the confidence of the pattern behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub pattern_id: PatternId,
    pub kind: PatternKind,
    pub action: Action,
    pub urgency: Urgency,
    pub confidence: f64,
    /// Whether the coordinator may execute this prediction.
    pub actionable: bool,
    /// Human-readable description of the originating pattern.
    pub reason: String,
}

impl Prediction {
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        self.actionable
    }
}
