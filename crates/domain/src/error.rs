//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`LightsOutError`] via `#[from]` (or an explicit `From` impl for boxed
//! adapter errors).

/// Top-level error for lightsout operations.
#[derive(Debug, thiserror::Error)]
pub enum LightsOutError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The event window handed to the detector is malformed.
    #[error("invalid event window")]
    Input(#[from] InputError),

    #[error("command sink error")]
    Sink(#[from] SinkError),

    #[error("concurrency conflict")]
    Conflict(#[from] ConcurrencyConflict),

    /// A persistence adapter failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The device bridge could not be polled.
    #[error("poll source error")]
    Poll(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("attribute name must not be empty")]
    EmptyAttribute,

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// A lookup found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Malformed detector input. The run is rejected and the registry kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("sequence {current} does not follow {previous}")]
    OutOfOrderSequence { previous: u64, current: u64 },

    #[error("event {sequence} is older than its predecessor")]
    TimestampRegression { sequence: u64 },
}

/// Failure reported by the command sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The bridge could not be reached. Retryable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The command did not complete within the configured bound. Retryable.
    #[error("command timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The bridge refused the command (unknown device, bad value, …).
    #[error("command rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// A detection run was requested while another one was in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a detection run is already in progress")]
pub struct ConcurrencyConflict;
