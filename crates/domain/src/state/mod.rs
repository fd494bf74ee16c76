//! Device state — attribute values, point-in-time snapshots, and transitions.

mod attribute_value;
mod snapshot;

pub use attribute_value::AttributeValue;
pub use snapshot::StateSnapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the on/off attribute reported by every light.
pub const ON_ATTRIBUTE: &str = "on";

/// An attribute reaching a specific value, e.g. `on = true`.
///
/// Transitions are what the detector mines: it does not care what the value
/// was before, only that the device arrived at this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub attribute: String,
    pub value: AttributeValue,
}

impl Transition {
    /// Build a transition.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            attribute: attribute.into(),
            value,
        }
    }

    /// The `on = true` transition.
    #[must_use]
    pub fn turned_on() -> Self {
        Self::new(ON_ATTRIBUTE, AttributeValue::Bool(true))
    }

    /// The `on = false` transition.
    #[must_use]
    pub fn turned_off() -> Self {
        Self::new(ON_ATTRIBUTE, AttributeValue::Bool(false))
    }

    /// Stable textual key used for grouping and identifiers.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, self.value)
    }
}
