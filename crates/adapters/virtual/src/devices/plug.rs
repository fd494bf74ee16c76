//! Virtual plug — a lamp on a smart socket, `on` only.

use std::collections::BTreeMap;
use std::sync::Mutex;

use lightsout_domain::id::DeviceId;
use lightsout_domain::state::{AttributeValue, ON_ATTRIBUTE};

use crate::error::VirtualBridgeError;

/// A simulated on/off socket.
#[derive(Default)]
pub struct VirtualPlug {
    on: Mutex<bool>,
}

impl VirtualPlug {
    pub fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        BTreeMap::from([(ON_ATTRIBUTE.to_string(), AttributeValue::Bool(*self.lock()))])
    }

    /// Set `on`.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualBridgeError`] for any other attribute or a non-boolean
    /// value.
    pub fn apply(
        &self,
        device_id: &DeviceId,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<(), VirtualBridgeError> {
        if attribute != ON_ATTRIBUTE {
            return Err(VirtualBridgeError::UnsupportedAttribute {
                device: device_id.clone(),
                attribute: attribute.to_string(),
            });
        }
        *self.lock() = super::expect_bool(attribute, value)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.on
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
