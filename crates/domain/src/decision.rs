//! Automation decisions — the coordinator's verdict on each prediction.
//!
//! Decisions are recorded for observability only; nothing feeds them back
//! into detection or prediction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::DecisionId;
use crate::prediction::Prediction;
use crate::time::Timestamp;

/// What the coordinator did with a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Executed,
    /// Dry-run mode, or automation globally disabled.
    SkippedDryRun,
    SkippedCooldown,
    SkippedAlreadyInState,
    /// The device failed its last command and has not been seen by a poll
    /// since, or has never been polled at all.
    SkippedUnreachable,
    Failed,
}

impl Verdict {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::SkippedDryRun => "skipped_dry_run",
            Self::SkippedCooldown => "skipped_cooldown",
            Self::SkippedAlreadyInState => "skipped_already_in_state",
            Self::SkippedUnreachable => "skipped_unreachable",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of talking to the command sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub attempts: u32,
    /// Last error, when the command ultimately failed.
    pub error: Option<String>,
}

/// One coordinator verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationDecision {
    pub id: DecisionId,
    pub prediction: Prediction,
    pub verdict: Verdict,
    /// Present when a command was issued (executed or failed).
    pub outcome: Option<CommandOutcome>,
    pub detail: Option<String>,
    pub decided_at: Timestamp,
}

impl AutomationDecision {
    /// Record a verdict that never reached the sink.
    #[must_use]
    pub fn skipped(prediction: Prediction, verdict: Verdict, decided_at: Timestamp) -> Self {
        Self {
            id: DecisionId::new(),
            prediction,
            verdict,
            outcome: None,
            detail: None,
            decided_at,
        }
    }

    /// Record a verdict that went through the sink.
    #[must_use]
    pub fn issued(
        prediction: Prediction,
        verdict: Verdict,
        outcome: CommandOutcome,
        decided_at: Timestamp,
    ) -> Self {
        Self {
            id: DecisionId::new(),
            prediction,
            verdict,
            outcome: Some(outcome),
            detail: None,
            decided_at,
        }
    }

    /// Attach a free-form explanation.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
