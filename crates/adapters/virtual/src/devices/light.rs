//! Virtual light — reports `on` and `bri`, accepts both.

use std::collections::BTreeMap;
use std::sync::Mutex;

use lightsout_domain::id::DeviceId;
use lightsout_domain::state::{AttributeValue, ON_ATTRIBUTE};

use crate::error::VirtualBridgeError;

/// Name of the brightness attribute.
pub const BRIGHTNESS_ATTRIBUTE: &str = "bri";

const MIN_BRIGHTNESS: i64 = 1;
const MAX_BRIGHTNESS: i64 = 254;

#[derive(Debug, Clone, Copy)]
struct LightState {
    on: bool,
    brightness: i64,
}

/// A simulated dimmable light.
pub struct VirtualLight {
    state: Mutex<LightState>,
}

impl Default for VirtualLight {
    fn default() -> Self {
        Self {
            state: Mutex::new(LightState {
                on: false,
                brightness: MAX_BRIGHTNESS,
            }),
        }
    }
}

impl VirtualLight {
    pub fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        let state = *self.lock_state();
        BTreeMap::from([
            (ON_ATTRIBUTE.to_string(), AttributeValue::Bool(state.on)),
            (
                BRIGHTNESS_ATTRIBUTE.to_string(),
                AttributeValue::Int(state.brightness),
            ),
        ])
    }

    /// Set `on` or `bri`.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualBridgeError::InvalidValue`] for a wrongly typed or
    /// out-of-range value, and [`VirtualBridgeError::UnsupportedAttribute`]
    /// for anything else.
    pub fn apply(
        &self,
        device_id: &DeviceId,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<(), VirtualBridgeError> {
        match attribute {
            ON_ATTRIBUTE => {
                let on = super::expect_bool(attribute, value)?;
                self.lock_state().on = on;
                Ok(())
            }
            BRIGHTNESS_ATTRIBUTE => match value {
                AttributeValue::Int(level) if (MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(level) => {
                    self.lock_state().brightness = *level;
                    Ok(())
                }
                other => Err(VirtualBridgeError::InvalidValue {
                    attribute: attribute.to_string(),
                    value: other.clone(),
                }),
            },
            _ => Err(VirtualBridgeError::UnsupportedAttribute {
                device: device_id.clone(),
                attribute: attribute.to_string(),
            }),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LightState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
