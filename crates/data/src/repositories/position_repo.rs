//! Position repository.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use zero_dte_core::InstrumentKind;

use crate::models::PositionRecord;
use crate::store::PositionStore;

#[derive(Debug, Clone)]
pub struct PositionRepository {
    pool: PgPool,
}

impl PositionRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<PositionRecord> {
    let kind: String = row.get("kind");
    Ok(PositionRecord {
        symbol: row.get("symbol"),
        kind: InstrumentKind::parse(&kind).ok_or_else(|| anyhow!("bad instrument kind {kind}"))?,
        quantity: row.get("quantity"),
        purchase_price: row.get("purchase_price"),
        sell_price: row.get("sell_price"),
        created: row.get("created"),
        closed: row.get("closed"),
    })
}

#[async_trait]
impl PositionStore for PositionRepository {
    async fn save(&self, record: &PositionRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO positions
                (symbol, kind, quantity, purchase_price, sell_price, created, closed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&record.symbol)
        .bind(record.kind.as_str())
        .bind(record.quantity)
        .bind(record.purchase_price)
        .bind(record.sell_price)
        .bind(record.created)
        .bind(record.closed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_open(&self) -> Result<Vec<PositionRecord>> {
        let rows = sqlx::query(
            r"
            SELECT symbol, kind, quantity, purchase_price, sell_price, created, closed
            FROM positions
            WHERE closed IS NULL
            ORDER BY created ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_open_by_symbols(&self, symbols: &[String]) -> Result<Vec<PositionRecord>> {
        let rows = sqlx::query(
            r"
            SELECT symbol, kind, quantity, purchase_price, sell_price, created, closed
            FROM positions
            WHERE closed IS NULL AND symbol = ANY($1)
            ORDER BY created ASC
            ",
        )
        .bind(symbols)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn close(
        &self,
        symbol: &str,
        sell_price: Option<Decimal>,
        closed: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE positions SET sell_price = $2, closed = $3
            WHERE symbol = $1 AND closed IS NULL
            ",
        )
        .bind(symbol)
        .bind(sell_price)
        .bind(closed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_closed_since(&self, since: DateTime<Utc>) -> Result<Vec<PositionRecord>> {
        let rows = sqlx::query(
            r"
            SELECT symbol, kind, quantity, purchase_price, sell_price, created, closed
            FROM positions
            WHERE closed IS NOT NULL AND closed >= $1
            ORDER BY closed ASC
            ",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
