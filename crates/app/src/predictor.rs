//! Predictor — turns the active pattern set and the current state into
//! candidate lighting actions.
//!
//! Prediction is pure: it reads a [`PatternSet`] snapshot, a
//! [`StateSnapshot`], and the recent events, and never mutates any of them.

use chrono::Duration;
use serde::Deserialize;

use lightsout_domain::event::StateChangeEvent;
use lightsout_domain::id::DeviceId;
use lightsout_domain::pattern::{
    CorrelationParams, Pattern, PatternParams, SequenceParams, TimeBasedParams,
};
use lightsout_domain::prediction::{Action, Prediction, Urgency};
use lightsout_domain::state::{StateSnapshot, Transition};
use lightsout_domain::time::{Calendar, Timestamp, saturating_add};

use crate::detector::circular::distance;
use crate::detector::seconds;
use crate::pattern_registry::PatternSet;

/// Tuning for the predictor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Predictions below this confidence are dropped.
    pub min_confidence: f64,
    /// How far from a time-based pattern's mean "now" may be.
    pub time_tolerance_minutes: f64,
    /// How recent a transition must be to suggest its correlated partner.
    pub advisory_horizon_secs: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            time_tolerance_minutes: 5.0,
            advisory_horizon_secs: 300,
        }
    }
}

/// Everything the predictor looks at besides the patterns.
#[derive(Debug, Clone, Copy)]
pub struct PredictionContext<'a> {
    pub now: Timestamp,
    pub states: &'a StateSnapshot,
    /// Recent events ordered by sequence.
    pub recent_events: &'a [StateChangeEvent],
}

impl PredictionContext<'_> {
    /// Whether `device_id` still has to reach `transition`. Unknown state
    /// (never polled) answers `false`: nothing is predicted blind.
    fn needs(&self, device_id: &DeviceId, transition: &Transition) -> bool {
        self.states
            .get(device_id, &transition.attribute)
            .is_some_and(|value| value != &transition.value)
    }

    fn last_reaching(
        &self,
        device_id: &DeviceId,
        transition: &Transition,
    ) -> Option<&StateChangeEvent> {
        self.recent_events
            .iter()
            .rev()
            .find(|e| e.timestamp <= self.now && e.is(device_id, transition))
    }
}

/// Stateless predictor.
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
    calendar: Calendar,
}

impl Predictor {
    #[must_use]
    pub fn new(config: PredictorConfig, calendar: Calendar) -> Self {
        Self { config, calendar }
    }

    #[must_use]
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Predictions applicable at `ctx.now`, sorted by descending confidence
    /// then pattern id.
    #[must_use]
    pub fn predict(&self, patterns: &PatternSet, ctx: &PredictionContext<'_>) -> Vec<Prediction> {
        let mut predictions: Vec<Prediction> = patterns
            .patterns()
            .iter()
            .filter(|p| p.confidence >= self.config.min_confidence)
            .filter_map(|pattern| match &pattern.params {
                PatternParams::TimeBased(p) => self.time_based(pattern, p, ctx),
                PatternParams::Sequence(p) => Self::sequence(pattern, p, ctx),
                PatternParams::Correlation(p) => self.correlation(pattern, p, ctx),
            })
            .collect();
        predictions.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.pattern_id.cmp(&b.pattern_id))
        });
        predictions
    }

    fn time_based(
        &self,
        pattern: &Pattern,
        params: &TimeBasedParams,
        ctx: &PredictionContext<'_>,
    ) -> Option<Prediction> {
        if !params
            .weekday_class
            .contains(self.calendar.weekday(ctx.now))
        {
            return None;
        }
        let minute = self.calendar.minute_of_day(ctx.now);
        if distance(minute, params.mean_minute) > self.config.time_tolerance_minutes {
            return None;
        }
        if !ctx.needs(&params.device_id, &params.transition) {
            return None;
        }
        Some(build(
            pattern,
            Action::reach(params.device_id.clone(), &params.transition),
            Urgency::Now,
            true,
        ))
    }

    fn sequence(
        pattern: &Pattern,
        params: &SequenceParams,
        ctx: &PredictionContext<'_>,
    ) -> Option<Prediction> {
        let trigger = ctx.last_reaching(&params.trigger_device, &params.trigger)?;
        let deadline = saturating_add(trigger.timestamp, seconds(params.lookahead_secs));
        if ctx.now > deadline {
            return None;
        }
        let responded = ctx.recent_events.iter().any(|e| {
            e.sequence > trigger.sequence
                && e.device_id == params.response_device
                && e.attribute == params.response.attribute
        });
        if responded || !ctx.needs(&params.response_device, &params.response) {
            return None;
        }
        Some(build(
            pattern,
            Action::reach(params.response_device.clone(), &params.response),
            Urgency::Before { deadline },
            true,
        ))
    }

    fn correlation(
        &self,
        pattern: &Pattern,
        params: &CorrelationParams,
        ctx: &PredictionContext<'_>,
    ) -> Option<Prediction> {
        let horizon = seconds(self.config.advisory_horizon_secs);
        let recent = |device_id: &DeviceId| {
            ctx.last_reaching(device_id, &params.transition)
                .filter(|e| ctx.now - e.timestamp <= horizon)
                .map(|e| (e.sequence, e.timestamp))
        };
        // the partner of whichever device moved last
        let partner = match (recent(&params.first), recent(&params.second)) {
            (Some(a), Some(b)) if a > b => &params.second,
            (Some(_), Some(_)) | (None, Some(_)) => &params.first,
            (Some(_), None) => &params.second,
            (None, None) => return None,
        };
        if !ctx.needs(partner, &params.transition) {
            return None;
        }
        Some(build(
            pattern,
            Action::reach(partner.clone(), &params.transition),
            Urgency::Advisory,
            false,
        ))
    }
}

fn build(pattern: &Pattern, action: Action, urgency: Urgency, actionable: bool) -> Prediction {
    Prediction {
        pattern_id: pattern.id,
        kind: pattern.kind(),
        action,
        urgency,
        confidence: pattern.confidence,
        actionable,
        reason: pattern.to_string(),
    }
}

/// How far back the predictor needs events to evaluate `patterns`.
#[must_use]
pub fn lookback(patterns: &PatternSet, config: &PredictorConfig) -> Duration {
    patterns
        .patterns()
        .iter()
        .filter_map(|p| match &p.params {
            PatternParams::Sequence(s) => Some(seconds(s.lookahead_secs)),
            _ => None,
        })
        .fold(seconds(config.advisory_horizon_secs), |a, b| a.max(b))
}
