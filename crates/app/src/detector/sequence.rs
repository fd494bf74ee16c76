//! Sequence patterns: a transition on one device usually followed, within a
//! bounded lookahead, by a transition on another.
//!
//! Every trigger transition is one opportunity. An opportunity counts as a
//! hit for a response `(device, transition)` when that response happens
//! strictly after the trigger and no later than the lookahead, at most once
//! per opportunity.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use lightsout_domain::event::StateChangeEvent;
use lightsout_domain::id::DeviceId;
use lightsout_domain::pattern::{Pattern, PatternParams, SequenceParams};
use lightsout_domain::state::Transition;
use lightsout_domain::time::Timestamp;

use super::{DetectorConfig, candidate, seconds, smoothed};

type Subject = (DeviceId, String);

struct Trigger {
    transition: Transition,
    opportunities: u32,
    first_seen: Timestamp,
    last_seen: Timestamp,
}

struct Response {
    transition: Transition,
    hits: u32,
    total_delay_secs: f64,
    last_seen: Timestamp,
}

pub(super) fn detect(events: &[&StateChangeEvent], config: &DetectorConfig) -> Vec<Pattern> {
    let lookahead = seconds(config.sequence_lookahead_secs);

    let mut triggers: BTreeMap<Subject, Trigger> = BTreeMap::new();
    let mut responses: BTreeMap<(Subject, Subject), Response> = BTreeMap::new();

    for (i, trigger) in events.iter().enumerate() {
        let transition = trigger.transition();
        let trigger_key = (trigger.device_id.clone(), transition.key());
        let entry = triggers.entry(trigger_key.clone()).or_insert_with(|| Trigger {
            transition,
            opportunities: 0,
            first_seen: trigger.timestamp,
            last_seen: trigger.timestamp,
        });
        entry.opportunities += 1;
        entry.last_seen = trigger.timestamp;

        let mut answered: BTreeSet<Subject> = BTreeSet::new();
        for response in &events[i + 1..] {
            let delay = response.timestamp - trigger.timestamp;
            if delay > lookahead {
                break;
            }
            if response.device_id == trigger.device_id || delay <= Duration::zero() {
                continue;
            }
            let response_transition = response.transition();
            let response_key = (response.device_id.clone(), response_transition.key());
            if !answered.insert(response_key.clone()) {
                continue;
            }
            let hit = responses
                .entry((trigger_key.clone(), response_key))
                .or_insert_with(|| Response {
                    transition: response_transition,
                    hits: 0,
                    total_delay_secs: 0.0,
                    last_seen: response.timestamp,
                });
            hit.hits += 1;
            #[allow(clippy::cast_precision_loss)]
            let delay_secs = delay.num_milliseconds() as f64 / 1000.0;
            hit.total_delay_secs += delay_secs;
            hit.last_seen = response.timestamp;
        }
    }

    responses
        .into_iter()
        .filter_map(|((trigger_key, (response_device, _)), response)| {
            let trigger = triggers.get(&trigger_key)?;
            if trigger.opportunities < config.min_support {
                return None;
            }
            let probability = f64::from(response.hits) / f64::from(trigger.opportunities);
            if probability < config.min_sequence_probability {
                return None;
            }
            let params = PatternParams::Sequence(SequenceParams {
                trigger_device: trigger_key.0,
                trigger: trigger.transition.clone(),
                response_device,
                response: response.transition,
                lookahead_secs: config.sequence_lookahead_secs,
                probability,
                opportunities: trigger.opportunities,
                mean_delay_secs: response.total_delay_secs / f64::from(response.hits),
            });
            candidate(
                params,
                smoothed(response.hits, trigger.opportunities),
                trigger.opportunities,
                trigger.first_seen,
                response.last_seen.max(trigger.last_seen),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{History, at};
    use super::*;
    use crate::detector::PatternDetector;
    use lightsout_domain::pattern::PatternKind;
    use lightsout_domain::time::Calendar;

    fn detect_sequences(events: &[StateChangeEvent]) -> Vec<Pattern> {
        PatternDetector::new(DetectorConfig::default(), Calendar::utc())
            .detect(events)
            .unwrap()
            .into_iter()
            .filter(|p| p.kind() == PatternKind::Sequence)
            .collect()
    }

    fn params(pattern: &Pattern) -> &SequenceParams {
        match &pattern.params {
            PatternParams::Sequence(p) => p,
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn should_detect_kitchen_following_hall() {
        // hall on at scattered times, kitchen follows 40s later 9 times out of 10
        let mut h = History::default();
        for d in 0..10 {
            h.on("hall", at(d, 6 + d, 0, 0));
            if d != 3 {
                h.on("kitchen", at(d, 6 + d, 0, 40));
            }
        }
        let patterns = detect_sequences(&h.build());
        let pattern = patterns
            .iter()
            .find(|p| p.subject_key() == "sequence:hall>kitchen")
            .unwrap();
        let p = params(pattern);
        assert_eq!(p.opportunities, 10);
        assert!((p.probability - 0.9).abs() < 1e-9);
        assert!((p.mean_delay_secs - 40.0).abs() < 1e-9);
        assert!((pattern.confidence - 10.0 / 12.0).abs() < 1e-9);
        assert_eq!(pattern.support, 10);
    }

    #[test]
    fn should_ignore_responses_after_lookahead() {
        let mut h = History::default();
        for d in 0..6 {
            h.on("hall", at(d, 8, 0, 0));
            h.on("kitchen", at(d, 8, 5, 0));
        }
        assert!(detect_sequences(&h.build()).is_empty());
    }

    #[test]
    fn should_count_each_opportunity_once() {
        // kitchen flickers twice after every trigger
        let mut h = History::default();
        for d in 0..4 {
            h.on("hall", at(d, 8, 0, 0));
            h.on("kitchen", at(d, 8, 0, 10));
            h.off("kitchen", at(d, 8, 0, 20));
            h.on("kitchen", at(d, 8, 0, 30));
        }
        let patterns = detect_sequences(&h.build());
        let pattern = patterns
            .iter()
            .find(|p| p.subject_key() == "sequence:hall>kitchen")
            .unwrap();
        let p = params(pattern);
        assert!(p.probability <= 1.0);
        assert_eq!(p.opportunities, 4);
    }

    #[test]
    fn should_not_sequence_simultaneous_changes() {
        let mut h = History::default();
        for d in 0..5 {
            h.on("hall", at(d, 8, 0, 0));
            h.on("kitchen", at(d, 8, 0, 0));
        }
        assert!(detect_sequences(&h.build()).is_empty());
    }

    #[test]
    fn should_require_min_opportunities() {
        let mut h = History::default();
        for d in 0..2 {
            h.on("hall", at(d, 8, 0, 0));
            h.on("kitchen", at(d, 8, 0, 30));
        }
        assert!(detect_sequences(&h.build()).is_empty());
    }
}
