//! In-memory paper broker.
//!
//! Serves canned chains and marks, records placed orders, and fills them on
//! demand. Backs simulated runs without brokerage connectivity and doubles
//! as the test stand-in for [`BrokerGateway`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::BrokerError;
use crate::gateway::BrokerGateway;
use crate::types::{
    Account, AccountPosition, BrokerOrder, OptionChain, OrderStatus, OrderTicket, Quote,
};

#[derive(Default)]
pub struct PaperBroker {
    chain: Mutex<OptionChain>,
    marks: Mutex<HashMap<String, Decimal>>,
    positions: Mutex<Vec<AccountPosition>>,
    orders: Mutex<Vec<BrokerOrder>>,
    next_order_id: AtomicI64,
    place_order_calls: AtomicU32,
}

impl PaperBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_order_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn set_chain(&self, chain: OptionChain) {
        *self.chain.lock().expect("chain lock") = chain;
    }

    pub fn set_mark(&self, symbol: &str, mark: Decimal) {
        self.marks
            .lock()
            .expect("marks lock")
            .insert(symbol.to_string(), mark);
    }

    pub fn set_positions(&self, positions: Vec<AccountPosition>) {
        *self.positions.lock().expect("positions lock") = positions;
    }

    /// Marks every pending order as filled at the current instant.
    pub fn fill_open_orders(&self) {
        let now = Utc::now();
        for order in self.orders.lock().expect("orders lock").iter_mut() {
            if order.status == OrderStatus::Pending {
                order.status = OrderStatus::Filled;
                order.filled_at = Some(now);
            }
        }
    }

    /// Number of `place_order` calls observed.
    #[must_use]
    pub fn placed_count(&self) -> u32 {
        self.place_order_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn recorded_orders(&self) -> Vec<BrokerOrder> {
        self.orders.lock().expect("orders lock").clone()
    }
}

#[async_trait]
impl BrokerGateway for PaperBroker {
    async fn fetch_account(&self) -> Result<Account, BrokerError> {
        Ok(Account {
            account_hash: "paper".to_string(),
            positions: self.positions.lock().expect("positions lock").clone(),
        })
    }

    async fn fetch_option_chain(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<OptionChain, BrokerError> {
        let chain = self.chain.lock().expect("chain lock").clone();
        if chain.underlying != symbol {
            return Err(BrokerError::NotAvailable(format!(
                "no canned chain for {symbol}"
            )));
        }
        Ok(chain)
    }

    async fn fetch_expiration_dates(&self, _symbol: &str) -> Result<Vec<NaiveDate>, BrokerError> {
        let chain = self.chain.lock().expect("chain lock");
        let mut dates: Vec<NaiveDate> = chain.contracts().map(|c| c.expiration).collect();
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let mark = self
            .marks
            .lock()
            .expect("marks lock")
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::NotAvailable(format!("no quote for {symbol}")))?;
        Ok(Quote {
            symbol: symbol.to_string(),
            mark,
            quote_time: Utc::now(),
        })
    }

    async fn place_order(&self, ticket: &OrderTicket) -> Result<i64, BrokerError> {
        self.place_order_calls.fetch_add(1, Ordering::SeqCst);
        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        self.orders.lock().expect("orders lock").push(BrokerOrder {
            order_id,
            status: OrderStatus::Pending,
            legs: ticket.legs.clone(),
            order_type: ticket.order_type,
            quantity: ticket.quantity,
            entered_at: Some(Utc::now()),
            filled_at: None,
        });
        Ok(order_id)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<BrokerOrder, BrokerError> {
        self.orders
            .lock()
            .expect("orders lock")
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned()
            .ok_or_else(|| BrokerError::NotAvailable(format!("no order {order_id}")))
    }

    async fn fetch_orders(
        &self,
        _from: Option<DateTime<Utc>>,
        _to: Option<DateTime<Utc>>,
    ) -> Result<Vec<BrokerOrder>, BrokerError> {
        Ok(self.recorded_orders())
    }
}
