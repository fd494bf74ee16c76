//! Errors raised by the simulated bridge.

use lightsout_domain::error::{LightsOutError, SinkError};
use lightsout_domain::id::DeviceId;
use lightsout_domain::state::AttributeValue;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VirtualBridgeError {
    /// The bridge was switched offline (see [`crate::VirtualBridge::set_online`]).
    #[error("virtual bridge is offline")]
    Offline,

    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("device {device} has no attribute {attribute}")]
    UnsupportedAttribute { device: DeviceId, attribute: String },

    #[error("invalid value {value} for {attribute}")]
    InvalidValue {
        attribute: String,
        value: AttributeValue,
    },
}

impl From<VirtualBridgeError> for SinkError {
    fn from(err: VirtualBridgeError) -> Self {
        match err {
            VirtualBridgeError::Offline => Self::Transport(err.to_string()),
            other => Self::Rejected(other.to_string()),
        }
    }
}

impl From<VirtualBridgeError> for LightsOutError {
    fn from(err: VirtualBridgeError) -> Self {
        Self::Poll(Box::new(err))
    }
}
