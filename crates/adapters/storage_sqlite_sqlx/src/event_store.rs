//! `SQLite` implementation of [`EventStore`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use lightsout_app::ports::EventStore;
use lightsout_domain::error::LightsOutError;
use lightsout_domain::event::{StateChange, StateChangeEvent};
use lightsout_domain::id::DeviceId;
use lightsout_domain::time::{TimeWindow, Timestamp};

use crate::error::{StorageError, decode_json, decode_millis};

struct Wrapper(StateChangeEvent);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let sequence: i64 = row.try_get("sequence")?;
        let device_id: String = row.try_get("device_id")?;
        let attribute: String = row.try_get("attribute")?;
        let previous: String = row.try_get("previous")?;
        let value: String = row.try_get("value")?;
        let timestamp_ms: i64 = row.try_get("timestamp_ms")?;

        Ok(Self(StateChangeEvent {
            sequence: sequence.cast_unsigned(),
            device_id: DeviceId::new(device_id),
            attribute,
            previous: decode_json(&previous)?,
            value: decode_json(&value)?,
            timestamp: decode_millis(timestamp_ms)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO events (device_id, attribute, previous, value, timestamp_ms)
    VALUES (?, ?, ?, ?, ?)
";

const SELECT_WINDOW: &str =
    "SELECT * FROM events WHERE timestamp_ms >= ? AND timestamp_ms < ? ORDER BY sequence";
const SELECT_RECENT: &str = "SELECT * FROM events ORDER BY sequence DESC LIMIT ?";
const DELETE_BEFORE: &str = "DELETE FROM events WHERE timestamp_ms < ?";
const COUNT: &str = "SELECT COUNT(*) FROM events";

/// `SQLite`-backed event store.
///
/// Sequence numbers come from the `AUTOINCREMENT` key, so they keep growing
/// even after old rows are purged.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new event store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventStore for SqliteEventStore {
    async fn append(
        &self,
        changes: Vec<StateChange>,
    ) -> Result<Vec<StateChangeEvent>, LightsOutError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let mut stored = Vec::with_capacity(changes.len());
        for change in changes {
            let previous = serde_json::to_string(&change.previous).map_err(StorageError::from)?;
            let value = serde_json::to_string(&change.value).map_err(StorageError::from)?;
            let sequence = sqlx::query(INSERT)
                .bind(change.device_id.as_str())
                .bind(&change.attribute)
                .bind(previous)
                .bind(value)
                .bind(change.timestamp.timestamp_millis())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?
                .last_insert_rowid();
            stored.push(change.into_event(sequence.cast_unsigned()));
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(stored)
    }

    async fn query(&self, window: TimeWindow) -> Result<Vec<StateChangeEvent>, LightsOutError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_WINDOW)
            .bind(window.start.timestamp_millis())
            .bind(window.end.timestamp_millis())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<StateChangeEvent>, LightsOutError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn purge_before(&self, cutoff: Timestamp) -> Result<u64, LightsOutError> {
        let result = sqlx::query(DELETE_BEFORE)
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, LightsOutError> {
        let (count,): (i64,) = sqlx::query_as(COUNT)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(count.cast_unsigned())
    }
}
