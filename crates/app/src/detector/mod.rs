//! Pattern detector — mines time-based, sequence and correlation patterns
//! from a window of state-change events.
//!
//! Detection is a pure function of its input: the same events and the same
//! [`DetectorConfig`] always yield the same patterns, with the same ids and
//! the same order. Nothing here reads the clock; every timestamp on a
//! pattern comes from the events themselves.

pub mod circular;
mod correlation;
mod sequence;
mod time_based;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Deserialize;

use lightsout_domain::error::InputError;
use lightsout_domain::event::{StateChangeEvent, validate_order};
use lightsout_domain::pattern::{Pattern, PatternParams};
use lightsout_domain::state::ON_ATTRIBUTE;
use lightsout_domain::time::{Calendar, Timestamp};

/// Thresholds and tuning knobs for one detection run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// How many days of history each run looks at.
    pub window_days: u32,
    /// Minimum number of corroborating observations for any pattern.
    pub min_support: u32,
    /// Patterns below this confidence are dropped.
    pub min_confidence: f64,
    /// Largest circular standard deviation a time-based pattern may have.
    pub max_dispersion_minutes: f64,
    /// Dispersion at which time-based confidence has decayed by `1/e`.
    pub dispersion_scale_minutes: f64,
    /// Neighbouring times of day further apart than this start a new cluster.
    pub cluster_gap_minutes: f64,
    /// How long after a trigger a response still counts.
    pub sequence_lookahead_secs: u64,
    /// Minimum raw `hits / opportunities` for a sequence.
    pub min_sequence_probability: f64,
    /// Two transitions this close together count as simultaneous.
    pub correlation_window_secs: u64,
    /// Minimum lift over independence for a correlation.
    pub min_lift: f64,
    /// Attributes whose transitions are mined. Everything else is ignored.
    pub tracked_attributes: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_support: 3,
            min_confidence: 0.6,
            max_dispersion_minutes: 30.0,
            dispersion_scale_minutes: 30.0,
            cluster_gap_minutes: 45.0,
            sequence_lookahead_secs: 120,
            min_sequence_probability: 0.6,
            correlation_window_secs: 30,
            min_lift: 2.0,
            tracked_attributes: vec![ON_ATTRIBUTE.to_string()],
        }
    }
}

impl DetectorConfig {
    fn tracks(&self, attribute: &str) -> bool {
        self.tracked_attributes.iter().any(|a| a == attribute)
    }
}

/// Stateless pattern miner.
#[derive(Debug, Clone)]
pub struct PatternDetector {
    config: DetectorConfig,
    calendar: Calendar,
}

impl PatternDetector {
    #[must_use]
    pub fn new(config: DetectorConfig, calendar: Calendar) -> Self {
        Self { config, calendar }
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    #[must_use]
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Mine every pattern supported by `events`.
    ///
    /// The result holds at most one pattern per subject key, every one at or
    /// above `min_confidence`, sorted by descending confidence then id.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when `events` is not strictly ordered by
    /// sequence or goes back in time.
    #[tracing::instrument(skip_all, fields(events = events.len()))]
    pub fn detect(&self, events: &[StateChangeEvent]) -> Result<Vec<Pattern>, InputError> {
        validate_order(events)?;

        let tracked: Vec<&StateChangeEvent> = events
            .iter()
            .filter(|e| self.config.tracks(&e.attribute))
            .collect();

        let mut candidates = time_based::detect(&tracked, &self.config, &self.calendar);
        candidates.extend(sequence::detect(&tracked, &self.config));
        candidates.extend(correlation::detect(&tracked, &self.config));

        let patterns = merge(candidates, self.config.min_confidence);
        tracing::debug!(patterns = patterns.len(), "detection pass finished");
        Ok(patterns)
    }
}

/// Keep the best candidate per subject key, drop weak ones, and sort.
fn merge(candidates: Vec<Pattern>, min_confidence: f64) -> Vec<Pattern> {
    let mut best: BTreeMap<String, Pattern> = BTreeMap::new();
    for candidate in candidates {
        if candidate.confidence < min_confidence {
            continue;
        }
        let key = candidate.subject_key();
        match best.get(&key) {
            Some(current) if prefer(current, &candidate) != Ordering::Greater => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    let mut patterns: Vec<Pattern> = best.into_values().collect();
    patterns.sort_by(Pattern::rank);
    patterns
}

/// `Greater` when `candidate` should replace `current`.
fn prefer(current: &Pattern, candidate: &Pattern) -> Ordering {
    candidate
        .confidence
        .total_cmp(&current.confidence)
        .then_with(|| candidate.support.cmp(&current.support))
        .then_with(|| render(&current.params).cmp(&render(&candidate.params)))
}

fn render(params: &PatternParams) -> String {
    format!("{params:?}")
}

/// Build a pattern, dropping (and logging) anything with a bogus confidence.
fn candidate(
    params: PatternParams,
    confidence: f64,
    support: u32,
    first_seen: Timestamp,
    last_updated: Timestamp,
) -> Option<Pattern> {
    match Pattern::new(params, confidence, support, first_seen, last_updated) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            tracing::warn!(error = %err, "discarding pattern candidate");
            None
        }
    }
}

/// Smoothed ratio `(hits + 1) / (trials + 2)`.
fn smoothed(hits: u32, trials: u32) -> f64 {
    f64::from(hits + 1) / f64::from(trials + 2)
}

/// Saturating conversion of a configured number of seconds.
pub(crate) fn seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use lightsout_domain::event::StateChange;
    use lightsout_domain::id::DeviceId;
    use lightsout_domain::pattern::PatternKind;
    use lightsout_domain::state::{AttributeValue, Transition};

    /// Builds ordered event windows for detector tests.
    #[derive(Default)]
    pub(crate) struct History {
        events: Vec<StateChangeEvent>,
    }

    impl History {
        pub(crate) fn push(&mut self, device: &str, transition: &Transition, at: Timestamp) {
            let sequence = self.events.len() as u64 + 1;
            let previous = match &transition.value {
                AttributeValue::Bool(v) => AttributeValue::Bool(!v),
                other => other.clone(),
            };
            self.events.push(
                StateChange {
                    device_id: DeviceId::new(device),
                    attribute: transition.attribute.clone(),
                    previous,
                    value: transition.value.clone(),
                    timestamp: at,
                }
                .into_event(sequence),
            );
        }

        pub(crate) fn on(&mut self, device: &str, at: Timestamp) {
            self.push(device, &Transition::turned_on(), at);
        }

        pub(crate) fn off(&mut self, device: &str, at: Timestamp) {
            self.push(device, &Transition::turned_off(), at);
        }

        /// Sort by time and renumber, so callers may push out of order.
        pub(crate) fn build(mut self) -> Vec<StateChangeEvent> {
            self.events.sort_by_key(|e| (e.timestamp, e.sequence));
            for (i, event) in self.events.iter_mut().enumerate() {
                event.sequence = i as u64 + 1;
            }
            self.events
        }
    }

    /// Midnight UTC on Monday 2024-01-01 plus `days`.
    pub(crate) fn day(days: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    pub(crate) fn at(days: i64, hour: i64, minute: i64, second: i64) -> Timestamp {
        day(days) + Duration::hours(hour) + Duration::minutes(minute) + Duration::seconds(second)
    }

    fn detector() -> PatternDetector {
        PatternDetector::new(DetectorConfig::default(), Calendar::utc())
    }

    /// Hall on around 07:00 on four weekdays, kitchen follows 40s later on
    /// nine out of ten evenings, and the two desk lamps always switch together.
    fn household() -> Vec<StateChangeEvent> {
        let mut h = History::default();
        for (d, (m, s)) in [(0, (58, 0)), (1, (1, 0)), (2, (0, 0)), (3, (59, 0))] {
            let hour = if m > 30 { 6 } else { 7 };
            h.on("hall", at(d, hour, m, s));
        }
        for d in 0..10 {
            h.on("porch", at(d, 19, (d * 7) % 60, 0));
            if d != 4 {
                h.on("stairs", at(d, 19, (d * 7) % 60, 40));
            }
        }
        for d in 0..5 {
            h.on("desk_left", at(d, 14, 10, 0));
            h.on("desk_right", at(d, 14, 10, 3));
        }
        h.build()
    }

    #[test]
    fn should_be_deterministic() {
        let events = household();
        let first = detector().detect(&events).unwrap();
        let second = detector().detect(&events).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn should_emit_at_most_one_pattern_per_subject() {
        let patterns = detector().detect(&household()).unwrap();
        let mut keys: Vec<String> = patterns.iter().map(Pattern::subject_key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn should_sort_by_descending_confidence() {
        let patterns = detector().detect(&household()).unwrap();
        assert!(
            patterns
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence)
        );
    }

    #[test]
    fn should_find_all_three_kinds() {
        let patterns = detector().detect(&household()).unwrap();
        for kind in [
            PatternKind::TimeBased,
            PatternKind::Sequence,
            PatternKind::Correlation,
        ] {
            assert!(
                patterns.iter().any(|p| p.kind() == kind),
                "missing {kind} pattern"
            );
        }
    }

    #[test]
    fn should_respect_min_confidence() {
        let config = DetectorConfig {
            min_confidence: 0.99,
            ..DetectorConfig::default()
        };
        let patterns = PatternDetector::new(config, Calendar::utc())
            .detect(&household())
            .unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn should_return_nothing_for_empty_window() {
        assert!(detector().detect(&[]).unwrap().is_empty());
    }

    #[test]
    fn should_reject_out_of_order_window() {
        let mut events = household();
        events.swap(0, 1);
        assert!(matches!(
            detector().detect(&events),
            Err(InputError::OutOfOrderSequence { .. })
        ));
    }

    #[test]
    fn should_ignore_untracked_attributes() {
        let mut h = History::default();
        for d in 0..6 {
            h.push(
                "hall",
                &Transition::new("bri", AttributeValue::Int(254)),
                at(d, 7, 0, 0),
            );
        }
        assert!(detector().detect(&h.build()).unwrap().is_empty());
    }

    #[test]
    fn should_stamp_patterns_with_event_times() {
        let events = household();
        let patterns = detector().detect(&events).unwrap();
        let earliest = events.first().unwrap().timestamp;
        let latest = events.last().unwrap().timestamp;
        for pattern in patterns {
            assert!(pattern.first_seen >= earliest);
            assert!(pattern.last_updated <= latest);
            assert!(pattern.first_seen <= pattern.last_updated);
        }
    }

    #[test]
    fn should_not_decrease_support_when_window_grows() {
        let mut h = History::default();
        for d in 0..3 {
            h.on("hall", at(d, 7, 0, 0));
        }
        let small = detector().detect(&h.build()).unwrap();

        let mut h = History::default();
        for d in 0..5 {
            h.on("hall", at(d, 7, 0, 0));
        }
        h.off("hall", at(5, 23, 0, 0));
        let large = detector().detect(&h.build()).unwrap();

        let support = |patterns: &[Pattern]| {
            patterns
                .iter()
                .find(|p| p.kind() == PatternKind::TimeBased)
                .map_or(0, |p| p.support)
        };
        assert!(support(&large) >= support(&small));
        assert!(support(&small) >= 3);
    }

    #[test]
    fn should_prefer_higher_confidence_when_merging() {
        let ts = day(0);
        let params = PatternParams::TimeBased(lightsout_domain::pattern::TimeBasedParams {
            device_id: DeviceId::new("hall"),
            transition: Transition::turned_on(),
            weekday_class: lightsout_domain::pattern::WeekdayClass::Monday,
            mean_minute: 420.0,
            dispersion_minutes: 2.0,
        });
        let weak = Pattern::new(params.clone(), 0.7, 9, ts, ts).unwrap();
        let strong = Pattern::new(params, 0.8, 3, ts, ts).unwrap();
        let merged = merge(vec![weak, strong], 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].support, 3);
    }

    #[test]
    fn should_smooth_ratios() {
        assert!((smoothed(9, 10) - 10.0 / 12.0).abs() < 1e-12);
        assert!((smoothed(0, 0) - 0.5).abs() < 1e-12);
    }
}
