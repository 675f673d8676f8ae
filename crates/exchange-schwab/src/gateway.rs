//! The brokerage gateway trait and its retrying decorator.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use zero_dte_core::retry;

use crate::error::BrokerError;
use crate::types::{Account, AccountPosition, BrokerOrder, OptionChain, OrderTicket, Quote};

/// Account, market data, and order operations against the brokerage.
///
/// All operations may fail transiently; callers wrap idempotent reads in
/// [`RetryingBroker`]. Order placement is deliberately excluded from any
/// retry path.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    async fn fetch_account(&self) -> Result<Account, BrokerError>;

    async fn fetch_positions(&self) -> Result<Vec<AccountPosition>, BrokerError> {
        Ok(self.fetch_account().await?.positions)
    }

    /// Option chain for expirations in `[from, to]`, split by right.
    async fn fetch_option_chain(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OptionChain, BrokerError>;

    async fn fetch_expiration_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>, BrokerError>;

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, BrokerError>;

    /// Places an order and returns the brokerage order id. Never retried by
    /// decorators: a retried placement could duplicate a live order.
    async fn place_order(&self, ticket: &OrderTicket) -> Result<i64, BrokerError>;

    async fn fetch_order(&self, order_id: i64) -> Result<BrokerOrder, BrokerError>;

    async fn fetch_orders(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<BrokerOrder>, BrokerError>;
}

/// Decorator applying bounded exponential backoff (3 attempts, 2s base) to
/// the idempotent read operations of an inner gateway.
pub struct RetryingBroker<G> {
    inner: G,
}

impl<G: BrokerGateway> RetryingBroker<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<G: BrokerGateway> BrokerGateway for RetryingBroker<G> {
    async fn fetch_account(&self) -> Result<Account, BrokerError> {
        retry::with_default_backoff("fetch_account", || self.inner.fetch_account()).await
    }

    async fn fetch_option_chain(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OptionChain, BrokerError> {
        retry::with_default_backoff("fetch_option_chain", || {
            self.inner.fetch_option_chain(symbol, from, to)
        })
        .await
    }

    async fn fetch_expiration_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>, BrokerError> {
        retry::with_default_backoff("fetch_expiration_dates", || {
            self.inner.fetch_expiration_dates(symbol)
        })
        .await
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        retry::with_default_backoff("fetch_quote", || self.inner.fetch_quote(symbol)).await
    }

    async fn place_order(&self, ticket: &OrderTicket) -> Result<i64, BrokerError> {
        // Never retried; see the trait docs.
        self.inner.place_order(ticket).await
    }

    async fn fetch_order(&self, order_id: i64) -> Result<BrokerOrder, BrokerError> {
        retry::with_default_backoff("fetch_order", || self.inner.fetch_order(order_id)).await
    }

    async fn fetch_orders(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<BrokerOrder>, BrokerError> {
        retry::with_default_backoff("fetch_orders", || self.inner.fetch_orders(from, to)).await
    }
}
