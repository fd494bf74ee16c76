//! Pattern — a statistically supported regularity mined from events.
//!
//! Every pattern carries kind-specific parameters as a tagged sum type
//! ([`PatternParams`]), a confidence in `[0, 1]`, the number of corroborating
//! observations, and the time span those observations cover. Patterns are
//! produced wholesale by each detection run and never edited afterwards.

mod weekday_class;

pub use weekday_class::WeekdayClass;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{DeviceId, PatternId};
use crate::state::Transition;
use crate::time::{Timestamp, format_minute_of_day};

/// The three families of regularity the detector looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TimeBased,
    Sequence,
    Correlation,
}

impl PatternKind {
    /// Stable snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimeBased => "time_based",
            Self::Sequence => "sequence",
            Self::Correlation => "correlation",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device reliably reaching a transition around the same local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedParams {
    pub device_id: DeviceId,
    pub transition: Transition,
    pub weekday_class: WeekdayClass,
    /// Circular mean, minutes since local midnight.
    pub mean_minute: f64,
    /// Circular standard deviation, in minutes.
    pub dispersion_minutes: f64,
}

/// A transition on one device usually followed by one on another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceParams {
    pub trigger_device: DeviceId,
    pub trigger: Transition,
    pub response_device: DeviceId,
    pub response: Transition,
    pub lookahead_secs: u64,
    /// Raw `hits / opportunities`, before smoothing.
    pub probability: f64,
    pub opportunities: u32,
    pub mean_delay_secs: f64,
}

/// Two devices reaching the same transition together more often than chance.
///
/// `first < second` always holds, so the pair is unordered by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationParams {
    pub first: DeviceId,
    pub second: DeviceId,
    pub transition: Transition,
    pub window_secs: u64,
    pub lift: f64,
    pub joint_support: u32,
}

/// Kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternParams {
    TimeBased(TimeBasedParams),
    Sequence(SequenceParams),
    Correlation(CorrelationParams),
}

impl PatternParams {
    /// Which family these parameters belong to.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        match self {
            Self::TimeBased(_) => PatternKind::TimeBased,
            Self::Sequence(_) => PatternKind::Sequence,
            Self::Correlation(_) => PatternKind::Correlation,
        }
    }

    /// The `(kind, subject)` key under which at most one pattern may exist.
    #[must_use]
    pub fn subject_key(&self) -> String {
        match self {
            Self::TimeBased(p) => format!("time_based:{}:{}", p.device_id, p.transition),
            Self::Sequence(p) => format!("sequence:{}>{}", p.trigger_device, p.response_device),
            Self::Correlation(p) => format!("correlation:{}+{}", p.first, p.second),
        }
    }

    /// The devices the pattern talks about.
    #[must_use]
    pub fn devices(&self) -> Vec<&DeviceId> {
        match self {
            Self::TimeBased(p) => vec![&p.device_id],
            Self::Sequence(p) => vec![&p.trigger_device, &p.response_device],
            Self::Correlation(p) => vec![&p.first, &p.second],
        }
    }
}

/// A discovered regularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub params: PatternParams,
    pub confidence: f64,
    /// Number of corroborating observations.
    pub support: u32,
    pub first_seen: Timestamp,
    pub last_updated: Timestamp,
}

impl Pattern {
    /// Create a pattern, deriving its id from the subject key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ConfidenceOutOfRange`] when `confidence`
    /// is not within `[0, 1]`.
    pub fn new(
        params: PatternParams,
        confidence: f64,
        support: u32,
        first_seen: Timestamp,
        last_updated: Timestamp,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            id: PatternId::derive(&params.subject_key()),
            params,
            confidence,
            support,
            first_seen,
            last_updated,
        })
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.params.kind()
    }

    #[must_use]
    pub fn subject_key(&self) -> String {
        self.params.subject_key()
    }

    /// Registry ordering: highest confidence first, then by id.
    #[must_use]
    pub fn rank(a: &Self, b: &Self) -> Ordering {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            PatternParams::TimeBased(p) => write!(
                f,
                "{} reaches {} around {} on {} (±{:.1} min)",
                p.device_id,
                p.transition,
                format_minute_of_day(p.mean_minute),
                p.weekday_class,
                p.dispersion_minutes,
            )?,
            PatternParams::Sequence(p) => write!(
                f,
                "when {} reaches {}, {} reaches {} within {}s (p={:.2} over {})",
                p.trigger_device,
                p.trigger,
                p.response_device,
                p.response,
                p.lookahead_secs,
                p.probability,
                p.opportunities,
            )?,
            PatternParams::Correlation(p) => write!(
                f,
                "{} and {} reach {} together (lift {:.1})",
                p.first, p.second, p.transition, p.lift,
            )?,
        }
        write!(
            f,
            " [confidence {:.0}%, seen {} times]",
            self.confidence * 100.0,
            self.support
        )
    }
}
