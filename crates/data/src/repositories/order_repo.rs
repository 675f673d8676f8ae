//! Order leg repository.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use zero_dte_core::InstrumentKind;

use crate::models::OrderLegRecord;
use crate::store::OrderStore;

/// Repository for submitted order legs.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<OrderLegRecord> {
    let kind: String = row.get("kind");
    Ok(OrderLegRecord {
        order_id: row.get("order_id"),
        symbol: row.get("symbol"),
        kind: InstrumentKind::parse(&kind).ok_or_else(|| anyhow!("bad instrument kind {kind}"))?,
        quantity: row.get("quantity"),
        created: row.get("created"),
        filled: row.get("filled"),
    })
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn save_leg(&self, record: &OrderLegRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO order_legs (order_id, symbol, kind, quantity, created, filled)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(record.order_id)
        .bind(&record.symbol)
        .bind(record.kind.as_str())
        .bind(record.quantity)
        .bind(record.created)
        .bind(record.filled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_unfilled_legs(&self) -> Result<Vec<OrderLegRecord>> {
        let rows = sqlx::query(
            r"
            SELECT order_id, symbol, kind, quantity, created, filled
            FROM order_legs
            WHERE filled IS NULL
            ORDER BY created ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn mark_filled(&self, order_id: i64, filled: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE order_legs SET filled = $2 WHERE order_id = $1 AND filled IS NULL")
            .bind(order_id)
            .bind(filled)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
