//! Time-based patterns: a device reaching a transition around the same
//! local time on the same class of day.
//!
//! Each `(device, transition)` group is bucketed twice, once per individual
//! weekday and once into weekdays/weekend. Within a bucket the times of day
//! are clustered on the 24h circle; every cluster dense and large enough
//! becomes a candidate, and the merge step keeps the most confident one.

use std::collections::BTreeMap;

use lightsout_domain::event::StateChangeEvent;
use lightsout_domain::id::DeviceId;
use lightsout_domain::pattern::{Pattern, PatternParams, TimeBasedParams, WeekdayClass};
use lightsout_domain::state::Transition;
use lightsout_domain::time::Calendar;

use super::circular::{clusters, summarize};
use super::{DetectorConfig, candidate, count};

/// Best confidence a time-based pattern can ever reach.
const CONFIDENCE_CEILING: f64 = 0.95;

pub(super) fn detect(
    events: &[&StateChangeEvent],
    config: &DetectorConfig,
    calendar: &Calendar,
) -> Vec<Pattern> {
    let mut groups: BTreeMap<(DeviceId, String), (Transition, Vec<&StateChangeEvent>)> =
        BTreeMap::new();
    for event in events {
        let transition = event.transition();
        groups
            .entry((event.device_id.clone(), transition.key()))
            .or_insert_with(|| (transition, Vec::new()))
            .1
            .push(event);
    }

    let mut found = Vec::new();
    for ((device_id, _), (transition, group)) in groups {
        if count(group.len()) < config.min_support {
            continue;
        }
        let mut by_class: BTreeMap<WeekdayClass, Vec<&StateChangeEvent>> = BTreeMap::new();
        for event in group {
            let day = calendar.weekday(event.timestamp);
            by_class
                .entry(WeekdayClass::of_day(day))
                .or_default()
                .push(event);
            by_class
                .entry(WeekdayClass::derived_of(day))
                .or_default()
                .push(event);
        }
        for (class, members) in by_class {
            found.extend(clustered(
                &device_id,
                &transition,
                class,
                &members,
                config,
                calendar,
            ));
        }
    }
    found
}

fn clustered(
    device_id: &DeviceId,
    transition: &Transition,
    weekday_class: WeekdayClass,
    members: &[&StateChangeEvent],
    config: &DetectorConfig,
    calendar: &Calendar,
) -> Vec<Pattern> {
    let minutes: Vec<f64> = members
        .iter()
        .map(|e| calendar.minute_of_day(e.timestamp))
        .collect();

    clusters(&minutes, config.cluster_gap_minutes)
        .into_iter()
        .filter(|cluster| count(cluster.len()) >= config.min_support)
        .filter_map(|cluster| {
            let sample: Vec<f64> = cluster.iter().map(|i| minutes[*i]).collect();
            let summary = summarize(&sample)?;
            if summary.dispersion_minutes > config.max_dispersion_minutes {
                return None;
            }
            let support = count(cluster.len());
            let first_seen = cluster.iter().map(|i| members[*i].timestamp).min()?;
            let last_updated = cluster.iter().map(|i| members[*i].timestamp).max()?;
            let params = PatternParams::TimeBased(TimeBasedParams {
                device_id: device_id.clone(),
                transition: transition.clone(),
                weekday_class,
                mean_minute: summary.mean_minute,
                dispersion_minutes: summary.dispersion_minutes,
            });
            candidate(
                params,
                confidence(
                    support,
                    summary.dispersion_minutes,
                    config.dispersion_scale_minutes,
                ),
                support,
                first_seen,
                last_updated,
            )
        })
        .collect()
}

/// Grows with support, decays with dispersion, never exceeds the ceiling.
fn confidence(support: u32, dispersion_minutes: f64, scale_minutes: f64) -> f64 {
    let n = f64::from(support);
    let regularity = if scale_minutes > 0.0 {
        (-dispersion_minutes / scale_minutes).exp()
    } else {
        1.0
    };
    (CONFIDENCE_CEILING * n / (n + 1.0) * regularity).clamp(0.0, 1.0)
}
