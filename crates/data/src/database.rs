use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the specified `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Creates the agent tables when they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS order_legs (
                id BIGSERIAL PRIMARY KEY,
                order_id BIGINT NOT NULL,
                symbol TEXT NOT NULL,
                kind TEXT NOT NULL,
                quantity NUMERIC NOT NULL,
                created TIMESTAMPTZ NOT NULL,
                filled TIMESTAMPTZ
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS positions (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL,
                kind TEXT NOT NULL,
                quantity NUMERIC NOT NULL,
                purchase_price NUMERIC NOT NULL,
                sell_price NUMERIC,
                created TIMESTAMPTZ NOT NULL,
                closed TIMESTAMPTZ
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS quotes (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL,
                mark NUMERIC NOT NULL,
                created TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS gex_snapshots (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL,
                created TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL,
                UNIQUE (symbol, created)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
