//! GEX snapshot repository. Snapshots are stored as opaque JSONB keyed by
//! (symbol, captured-at).

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use crate::store::GexSnapshotStore;

#[derive(Debug, Clone)]
pub struct GexSnapshotRepository {
    pool: PgPool,
}

impl GexSnapshotRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GexSnapshotStore for GexSnapshotRepository {
    async fn save_snapshot(
        &self,
        symbol: &str,
        created: DateTime<Utc>,
        data: &JsonValue,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO gex_snapshots (symbol, created, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (symbol, created) DO NOTHING
            ",
        )
        .bind(symbol)
        .bind(created)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_snapshot(&self, symbol: &str) -> Result<Option<JsonValue>> {
        let row = sqlx::query(
            "SELECT data FROM gex_snapshots WHERE symbol = $1 ORDER BY created DESC LIMIT 1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("data")))
    }

    async fn capture_times(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let rows = sqlx::query(
            r"
            SELECT created FROM gex_snapshots
            WHERE symbol = $1 AND created BETWEEN $2 AND $3
            ORDER BY created ASC
            ",
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("created")).collect())
    }

    async fn snapshots_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<JsonValue>> {
        let rows = sqlx::query(
            r"
            SELECT data FROM gex_snapshots
            WHERE symbol = $1 AND created BETWEEN $2 AND $3
            ORDER BY created ASC
            ",
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("data")).collect())
    }
}
