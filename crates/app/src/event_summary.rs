//! Event summary — per-device transition counts and an hour-of-day
//! histogram over a span of recent days.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use lightsout_domain::error::LightsOutError;
use lightsout_domain::event::StateChangeEvent;
use lightsout_domain::id::DeviceId;
use lightsout_domain::time::{Calendar, TimeWindow, Timestamp, saturating_add};

use crate::ports::EventStore;

/// Transition counts of one device, keyed by `attribute=value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceActivity {
    pub transitions: BTreeMap<String, u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub days: u32,
    pub total_events: u64,
    pub by_device: BTreeMap<DeviceId, DeviceActivity>,
    /// Events per local hour of day, index 0 is midnight.
    pub by_hour: [u64; 24],
}

impl EventSummary {
    /// Aggregate `events`, bucketing hours on the `calendar`'s wall clock.
    #[must_use]
    pub fn from_events(days: u32, events: &[StateChangeEvent], calendar: Calendar) -> Self {
        let mut summary = Self {
            days,
            total_events: 0,
            by_device: BTreeMap::new(),
            by_hour: [0; 24],
        };
        for event in events {
            summary.total_events += 1;
            let activity = summary.by_device.entry(event.device_id.clone()).or_default();
            *activity
                .transitions
                .entry(event.transition().key())
                .or_default() += 1;
            activity.total += 1;
            if let Some(slot) = usize::try_from(calendar.hour(event.timestamp))
                .ok()
                .and_then(|hour| summary.by_hour.get_mut(hour))
            {
                *slot += 1;
            }
        }
        summary
    }
}

/// Summarize the `days` days up to and including `now`.
///
/// # Errors
///
/// Returns a storage error from the event store.
pub async fn summarize<ES: EventStore>(
    store: &ES,
    calendar: Calendar,
    days: u32,
    now: Timestamp,
) -> Result<EventSummary, LightsOutError> {
    let window = TimeWindow::ending_at(
        saturating_add(now, Duration::milliseconds(1)),
        Duration::days(i64::from(days)),
    );
    let events = store.query(window).await?;
    Ok(EventSummary::from_events(days, &events, calendar))
}
