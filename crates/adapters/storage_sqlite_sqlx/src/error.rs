//! Storage-specific error type wrapping sqlx errors.

use lightsout_domain::error::LightsOutError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to (de)serialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for LightsOutError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Milliseconds since the epoch back into a timestamp, as a row decode error
/// when out of range.
pub(crate) fn decode_millis(
    millis: i64,
) -> Result<lightsout_domain::time::Timestamp, sqlx::Error> {
    chrono::DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        sqlx::Error::Decode(format!("timestamp {millis}ms out of range").into())
    })
}

/// Decode a JSON column.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}
