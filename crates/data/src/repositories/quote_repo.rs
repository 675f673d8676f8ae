//! Captured mark price repository.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::MarkRecord;
use crate::store::QuoteStore;

#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: PgPool,
}

impl QuoteRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteStore for QuoteRepository {
    async fn save_mark(&self, record: &MarkRecord) -> Result<()> {
        sqlx::query("INSERT INTO quotes (symbol, mark, created) VALUES ($1, $2, $3)")
            .bind(&record.symbol)
            .bind(record.mark)
            .bind(record.created)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
