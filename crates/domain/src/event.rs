//! State-change events — the immutable facts the detector mines.
//!
//! Ingestion produces a [`StateChange`] whenever a polled snapshot differs
//! from the last known value; the event store stamps it with a sequence
//! number and hands back a [`StateChangeEvent`]. Events are never mutated.

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::id::DeviceId;
use crate::state::{AttributeValue, Transition};
use crate::time::Timestamp;

/// A change observed by ingestion, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub device_id: DeviceId,
    pub attribute: String,
    pub previous: AttributeValue,
    pub value: AttributeValue,
    pub timestamp: Timestamp,
}

impl StateChange {
    /// Attach the sequence number assigned by the event store.
    #[must_use]
    pub fn into_event(self, sequence: u64) -> StateChangeEvent {
        StateChangeEvent {
            sequence,
            device_id: self.device_id,
            attribute: self.attribute,
            previous: self.previous,
            value: self.value,
            timestamp: self.timestamp,
        }
    }
}

/// A persisted transition of one device attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    /// Monotonically increasing, assigned on append.
    pub sequence: u64,
    pub device_id: DeviceId,
    pub attribute: String,
    pub previous: AttributeValue,
    pub value: AttributeValue,
    pub timestamp: Timestamp,
}

impl StateChangeEvent {
    /// The transition this event represents (`attribute = value`).
    #[must_use]
    pub fn transition(&self) -> Transition {
        Transition::new(self.attribute.clone(), self.value.clone())
    }

    /// Whether this event is `device_id` arriving at `transition`.
    #[must_use]
    pub fn is(&self, device_id: &DeviceId, transition: &Transition) -> bool {
        &self.device_id == device_id
            && self.attribute == transition.attribute
            && self.value == transition.value
    }
}

/// Check that `events` is strictly ordered by sequence and never goes back
/// in time.
///
/// # Errors
///
/// Returns the first [`InputError`] found.
pub fn validate_order(events: &[StateChangeEvent]) -> Result<(), InputError> {
    for pair in events.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.sequence <= previous.sequence {
            return Err(InputError::OutOfOrderSequence {
                previous: previous.sequence,
                current: current.sequence,
            });
        }
        if current.timestamp < previous.timestamp {
            return Err(InputError::TimestampRegression {
                sequence: current.sequence,
            });
        }
    }
    Ok(())
}
