//! Typed identifiers.
//!
//! Patterns and decisions use UUID-backed newtypes. Devices are named by the
//! bridge that owns them, so [`DeviceId`] wraps the bridge's string key.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Pattern`](crate::pattern::Pattern).
    PatternId
);

define_id!(
    /// Unique identifier for an [`AutomationDecision`](crate::decision::AutomationDecision).
    DecisionId
);

const PATTERN_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x6c, 0x69, 0x67, 0x68, 0x74, 0x73, 0x6f, 0x75, 0x74, 0x2d, 0x70, 0x61, 0x74, 0x74, 0x65, 0x72,
]);

impl PatternId {
    /// Derive a stable identifier from a pattern's subject key.
    ///
    /// The same key always yields the same id, so a pattern that survives
    /// several detection runs keeps its identity.
    #[must_use]
    pub fn derive(subject_key: &str) -> Self {
        Self(uuid::Uuid::new_v5(&PATTERN_NAMESPACE, subject_key.as_bytes()))
    }
}

/// Identifier of a lighting device as reported by the bridge (e.g. `hall`, `3`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a bridge key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the bridge key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
