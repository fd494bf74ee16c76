//! Simulated lighting devices — dimmable lights and on/off plugs.

mod light;
mod plug;

pub use light::{BRIGHTNESS_ATTRIBUTE, VirtualLight};
pub use plug::VirtualPlug;

use std::collections::BTreeMap;

use lightsout_domain::id::DeviceId;
use lightsout_domain::state::AttributeValue;

use crate::error::VirtualBridgeError;

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Plug(VirtualPlug),
}

impl VirtualDevice {
    /// Every attribute the device reports on a poll.
    pub fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        match self {
            Self::Light(d) => d.attributes(),
            Self::Plug(d) => d.attributes(),
        }
    }

    /// Set one attribute.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualBridgeError`] when the attribute is unknown to the
    /// device or the value has the wrong type or range.
    pub fn apply(
        &self,
        device_id: &DeviceId,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<(), VirtualBridgeError> {
        match self {
            Self::Light(d) => d.apply(device_id, attribute, value),
            Self::Plug(d) => d.apply(device_id, attribute, value),
        }
    }
}

/// The `bool` inside `value`, or an [`VirtualBridgeError::InvalidValue`].
fn expect_bool(attribute: &str, value: &AttributeValue) -> Result<bool, VirtualBridgeError> {
    match value {
        AttributeValue::Bool(on) => Ok(*on),
        other => Err(VirtualBridgeError::InvalidValue {
            attribute: attribute.to_string(),
            value: other.clone(),
        }),
    }
}
