//! Correlation patterns: two devices reaching the same transition within a
//! short window of each other more often than independence would explain.
//!
//! Transitions are paired greedily and one-to-one. Lift compares the joint
//! count with what two independent processes spread over the observed span
//! would produce by chance.

use std::collections::BTreeMap;

use lightsout_domain::event::StateChangeEvent;
use lightsout_domain::id::DeviceId;
use lightsout_domain::pattern::{CorrelationParams, Pattern, PatternParams};
use lightsout_domain::state::Transition;
use lightsout_domain::time::Timestamp;

use super::{DetectorConfig, candidate, count, seconds, smoothed};

pub(super) fn detect(events: &[&StateChangeEvent], config: &DetectorConfig) -> Vec<Pattern> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Vec::new();
    };
    let window = seconds(config.correlation_window_secs);
    let slots = slot_count(
        (last.timestamp - first.timestamp).num_milliseconds(),
        window.num_milliseconds(),
    );

    // transition key -> (transition, device -> timestamps)
    let mut by_transition: BTreeMap<String, (Transition, BTreeMap<DeviceId, Vec<Timestamp>>)> =
        BTreeMap::new();
    for event in events {
        let transition = event.transition();
        by_transition
            .entry(transition.key())
            .or_insert_with(|| (transition, BTreeMap::new()))
            .1
            .entry(event.device_id.clone())
            .or_default()
            .push(event.timestamp);
    }

    let mut found = Vec::new();
    for (transition, devices) in by_transition.into_values() {
        let devices: Vec<(&DeviceId, &Vec<Timestamp>)> = devices.iter().collect();
        for (i, (first_id, first_times)) in devices.iter().enumerate() {
            for (second_id, second_times) in &devices[i + 1..] {
                let pairs = matched(first_times, second_times, window);
                let joint = count(pairs.len());
                if joint < config.min_support {
                    continue;
                }
                let (n_first, n_second) = (count(first_times.len()), count(second_times.len()));
                let lift = f64::from(joint) * slots / (f64::from(n_first) * f64::from(n_second));
                if lift < config.min_lift {
                    continue;
                }
                let Some(first_seen) = pairs.iter().map(|(a, b)| *a.min(b)).min() else {
                    continue;
                };
                let Some(last_updated) = pairs.iter().map(|(a, b)| *a.max(b)).max() else {
                    continue;
                };
                let params = PatternParams::Correlation(CorrelationParams {
                    first: (*first_id).clone(),
                    second: (*second_id).clone(),
                    transition: transition.clone(),
                    window_secs: config.correlation_window_secs,
                    lift,
                    joint_support: joint,
                });
                found.extend(candidate(
                    params,
                    smoothed(joint, n_first.max(n_second)),
                    joint,
                    first_seen,
                    last_updated,
                ));
            }
        }
    }
    found
}

/// Number of independent `2 * window` slots in the observed span, at least one.
fn slot_count(span_millis: i64, window_millis: i64) -> f64 {
    let slot = window_millis.saturating_mul(2);
    if slot <= 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let slots = span_millis as f64 / slot as f64;
    slots.max(1.0)
}

/// Greedy one-to-one pairing of two sorted timestamp lists.
fn matched(
    first: &[Timestamp],
    second: &[Timestamp],
    window: chrono::Duration,
) -> Vec<(Timestamp, Timestamp)> {
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < first.len() && j < second.len() {
        let (a, b) = (first[i], second[j]);
        if (a - b).abs() <= window {
            pairs.push((a, b));
            i += 1;
            j += 1;
        } else if a < b {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}
