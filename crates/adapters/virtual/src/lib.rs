//! # lightsout-adapter-virtual
//!
//! Simulated lighting bridge for demos and tests.
//!
//! ## Provided devices
//!
//! | Device | Attributes | Commands |
//! |--------|------------|----------|
//! | Virtual light | `on`, `bri` | `on=true/false`, `bri=1..254` |
//! | Virtual plug | `on` | `on=true/false` |
//!
//! The bridge answers polls with a [`StateSnapshot`] of every device and
//! applies actions coming from the automation coordinator. It can be switched
//! offline to exercise the retry and unreachable paths.
//!
//! ## Dependency rule
//!
//! Depends on `lightsout-app` (port traits) and `lightsout-domain` only.

mod devices;
mod error;

pub use devices::{BRIGHTNESS_ATTRIBUTE, VirtualDevice, VirtualLight, VirtualPlug};
pub use error::VirtualBridgeError;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

use lightsout_app::ports::{CommandSink, PollSource};
use lightsout_domain::error::{LightsOutError, SinkError};
use lightsout_domain::id::DeviceId;
use lightsout_domain::prediction::Action;
use lightsout_domain::state::{AttributeValue, StateSnapshot};

/// Which devices the bridge simulates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VirtualBridgeConfig {
    pub lights: Vec<String>,
    pub plugs: Vec<String>,
}

impl Default for VirtualBridgeConfig {
    fn default() -> Self {
        Self {
            lights: vec![
                "hall".to_string(),
                "kitchen".to_string(),
                "living_room".to_string(),
            ],
            plugs: vec!["desk_lamp".to_string()],
        }
    }
}

/// A bridge holding simulated devices in memory.
pub struct VirtualBridge {
    devices: BTreeMap<DeviceId, VirtualDevice>,
    online: AtomicBool,
}

impl Default for VirtualBridge {
    fn default() -> Self {
        Self::from_config(&VirtualBridgeConfig::default())
    }
}

impl VirtualBridge {
    /// A bridge with no devices.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            devices: BTreeMap::new(),
            online: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn from_config(config: &VirtualBridgeConfig) -> Self {
        let bridge = config
            .lights
            .iter()
            .fold(Self::empty(), |bridge, id| bridge.with_light(id.as_str()));
        config
            .plugs
            .iter()
            .fold(bridge, |bridge, id| bridge.with_plug(id.as_str()))
    }

    #[must_use]
    pub fn with_light(mut self, device_id: impl Into<DeviceId>) -> Self {
        self.devices.insert(
            device_id.into(),
            VirtualDevice::Light(VirtualLight::default()),
        );
        self
    }

    #[must_use]
    pub fn with_plug(mut self, device_id: impl Into<DeviceId>) -> Self {
        self.devices
            .insert(device_id.into(), VirtualDevice::Plug(VirtualPlug::default()));
        self
    }

    /// Simulate the bridge dropping off the network (or coming back).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Simulate someone flipping a switch by hand.
    ///
    /// Works even while the bridge is offline, like a wall switch would.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualBridgeError`] for an unknown device or an invalid
    /// attribute/value.
    pub fn set(
        &self,
        device_id: &DeviceId,
        attribute: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<(), VirtualBridgeError> {
        let device = self
            .devices
            .get(device_id)
            .ok_or_else(|| VirtualBridgeError::UnknownDevice(device_id.clone()))?;
        device.apply(device_id, attribute, &value.into())
    }

    /// Current state of every device, regardless of connectivity.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let mut snapshot = StateSnapshot::new();
        for (id, device) in &self.devices {
            for (attribute, value) in device.attributes() {
                snapshot.set(id.clone(), attribute, value);
            }
        }
        snapshot
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.keys()
    }
}

impl PollSource for VirtualBridge {
    async fn poll(&self) -> Result<StateSnapshot, LightsOutError> {
        if !self.is_online() {
            return Err(VirtualBridgeError::Offline.into());
        }
        Ok(self.snapshot())
    }
}

impl CommandSink for VirtualBridge {
    async fn execute(&self, action: &Action) -> Result<(), SinkError> {
        if !self.is_online() {
            return Err(VirtualBridgeError::Offline.into());
        }
        self.set(&action.device_id, &action.attribute, action.value.clone())?;
        tracing::debug!(%action, "virtual bridge applied command");
        Ok(())
    }
}
