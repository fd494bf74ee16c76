//! Point-in-time view of every device's attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::StateChange;
use crate::id::DeviceId;
use crate::state::AttributeValue;
use crate::time::Timestamp;

/// `device -> attribute -> value`, as returned by one bridge poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    devices: BTreeMap<DeviceId, BTreeMap<String, AttributeValue>>,
}

impl StateSnapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for tests and simulated bridges.
    #[must_use]
    pub fn with(
        mut self,
        device_id: impl Into<DeviceId>,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.set(device_id.into(), attribute.into(), value.into());
        self
    }

    /// Set one attribute of one device.
    pub fn set(&mut self, device_id: DeviceId, attribute: String, value: AttributeValue) {
        self.devices
            .entry(device_id)
            .or_default()
            .insert(attribute, value);
    }

    /// Current value of `attribute` on `device_id`, if known.
    #[must_use]
    pub fn get(&self, device_id: &DeviceId, attribute: &str) -> Option<&AttributeValue> {
        self.devices.get(device_id)?.get(attribute)
    }

    /// Whether the snapshot mentions `device_id` at all.
    #[must_use]
    pub fn contains_device(&self, device_id: &DeviceId) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Devices present in the snapshot, in key order.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.keys()
    }

    /// Every device with its attributes, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &BTreeMap<String, AttributeValue>)> {
        self.devices.iter()
    }

    /// Number of devices in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Reject snapshots with blank device ids or attribute names.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (device_id, attributes) in &self.devices {
            if device_id.as_str().trim().is_empty() {
                return Err(ValidationError::EmptyDeviceId);
            }
            if attributes.keys().any(|a| a.trim().is_empty()) {
                return Err(ValidationError::EmptyAttribute);
            }
        }
        Ok(())
    }

    /// Every attribute whose value differs between `self` and `next`.
    ///
    /// Devices or attributes that `self` has never seen produce no change:
    /// the first observation only seeds the last-known state.
    #[must_use]
    pub fn changes_to(&self, next: &Self, at: Timestamp) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for (device_id, attributes) in &next.devices {
            let Some(known) = self.devices.get(device_id) else {
                continue;
            };
            for (attribute, value) in attributes {
                match known.get(attribute) {
                    Some(previous) if previous != value => changes.push(StateChange {
                        device_id: device_id.clone(),
                        attribute: attribute.clone(),
                        previous: previous.clone(),
                        value: value.clone(),
                        timestamp: at,
                    }),
                    _ => {}
                }
            }
        }
        changes
    }

    /// Overlay every attribute of `other` onto `self`.
    pub fn merge(&mut self, other: &Self) {
        for (device_id, attributes) in &other.devices {
            let entry = self.devices.entry(device_id.clone()).or_default();
            for (attribute, value) in attributes {
                entry.insert(attribute.clone(), value.clone());
            }
        }
    }
}
