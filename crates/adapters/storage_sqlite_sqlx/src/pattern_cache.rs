//! `SQLite` implementation of [`PatternCache`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use lightsout_app::ports::PatternCache;
use lightsout_domain::error::LightsOutError;
use lightsout_domain::id::PatternId;
use lightsout_domain::pattern::Pattern;

use crate::error::{StorageError, decode_json, decode_millis};

struct Wrapper(Pattern);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let params: String = row.try_get("params")?;
        let confidence: f64 = row.try_get("confidence")?;
        let support: i64 = row.try_get("support")?;
        let first_seen_ms: i64 = row.try_get("first_seen_ms")?;
        let last_updated_ms: i64 = row.try_get("last_updated_ms")?;

        Ok(Self(Pattern {
            id: PatternId::from_uuid(id),
            params: decode_json(&params)?,
            confidence,
            support: u32::try_from(support).map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
            first_seen: decode_millis(first_seen_ms)?,
            last_updated: decode_millis(last_updated_ms)?,
        }))
    }
}

const DELETE_ALL: &str = "DELETE FROM patterns";
const INSERT: &str = r"
    INSERT INTO patterns (id, kind, params, confidence, support, first_seen_ms, last_updated_ms)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";
const SELECT_ALL: &str = "SELECT * FROM patterns ORDER BY confidence DESC, id";

/// `SQLite`-backed cache of the last detected pattern set.
pub struct SqlitePatternCache {
    pool: SqlitePool,
}

impl SqlitePatternCache {
    /// Create a new cache using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PatternCache for SqlitePatternCache {
    async fn load(&self) -> Result<Vec<Pattern>, LightsOutError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn save(&self, patterns: Vec<Pattern>) -> Result<(), LightsOutError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        sqlx::query(DELETE_ALL)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        for pattern in &patterns {
            let params = serde_json::to_string(&pattern.params).map_err(StorageError::from)?;
            sqlx::query(INSERT)
                .bind(pattern.id.as_uuid())
                .bind(pattern.kind().as_str())
                .bind(params)
                .bind(pattern.confidence)
                .bind(i64::from(pattern.support))
                .bind(pattern.first_seen.timestamp_millis())
                .bind(pattern.last_updated.timestamp_millis())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }
}
