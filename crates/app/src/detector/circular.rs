//! Statistics on the 24h clock.
//!
//! Times of day wrap at midnight, so 23:55 and 00:05 are ten minutes apart,
//! not almost a day. Everything here works on minutes-since-midnight mapped
//! onto the unit circle.

use std::f64::consts::TAU;

use lightsout_domain::time::MINUTES_PER_DAY;

/// Circular mean and spread of a set of times of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularSummary {
    /// Mean time, minutes since midnight in `[0, 1440)`.
    pub mean_minute: f64,
    /// Circular standard deviation, in minutes. Infinite when the times are
    /// spread uniformly around the clock.
    pub dispersion_minutes: f64,
}

fn to_angle(minute: f64) -> f64 {
    minute / MINUTES_PER_DAY * TAU
}

fn to_minutes(angle: f64) -> f64 {
    angle / TAU * MINUTES_PER_DAY
}

/// Summarize `minutes`, or `None` when empty.
#[must_use]
pub fn summarize(minutes: &[f64]) -> Option<CircularSummary> {
    if minutes.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = minutes.len() as f64;
    let (sin_sum, cos_sum) = minutes.iter().fold((0.0, 0.0), |(s, c), m| {
        let angle = to_angle(*m);
        (s + angle.sin(), c + angle.cos())
    });
    let (sin_mean, cos_mean) = (sin_sum / n, cos_sum / n);
    let resultant = sin_mean.hypot(cos_mean);

    let dispersion_minutes = if resultant <= f64::EPSILON {
        f64::INFINITY
    } else if resultant >= 1.0 {
        0.0
    } else {
        to_minutes((-2.0 * resultant.ln()).sqrt())
    };
    let mean_minute = to_minutes(sin_mean.atan2(cos_mean)).rem_euclid(MINUTES_PER_DAY);

    Some(CircularSummary {
        mean_minute,
        dispersion_minutes,
    })
}

/// Shortest distance between two times of day, in minutes.
#[must_use]
pub fn distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(MINUTES_PER_DAY);
    d.min(MINUTES_PER_DAY - d)
}

/// Split times of day into clusters wherever two neighbours on the clock are
/// more than `max_gap` minutes apart.
///
/// Returns indices into `minutes`. Clusters that straddle midnight stay
/// together.
#[must_use]
pub fn clusters(minutes: &[f64], max_gap: f64) -> Vec<Vec<usize>> {
    if minutes.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..minutes.len()).collect();
    order.sort_by(|a, b| minutes[*a].total_cmp(&minutes[*b]));

    // gap after position i (wrapping for the last one)
    let gap_after = |i: usize| {
        let here = minutes[order[i]];
        let next = minutes[order[(i + 1) % order.len()]];
        (next - here).rem_euclid(MINUTES_PER_DAY)
    };

    let len = order.len();
    let widest = (0..len)
        .max_by(|a, b| gap_after(*a).total_cmp(&gap_after(*b)))
        .unwrap_or(len - 1);
    if len == 1 || gap_after(widest) <= max_gap {
        return vec![order];
    }

    let mut result = Vec::new();
    let mut current = Vec::new();
    for step in 1..=len {
        let pos = (widest + step) % len;
        current.push(order[pos]);
        if gap_after(pos) > max_gap {
            result.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}
