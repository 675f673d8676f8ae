//! Schwab brokerage integration for the zero-DTE options agent.
//!
//! Exposes the [`BrokerGateway`] trait consumed by the strategy and GEX
//! services, a thin REST client implementing it, a retry decorator for
//! idempotent reads, and a paper broker for simulated runs and tests.

pub mod client;
pub mod error;
pub mod gateway;
pub mod paper;
pub mod types;

pub use client::SchwabClient;
pub use error::BrokerError;
pub use gateway::{BrokerGateway, RetryingBroker};
pub use paper::PaperBroker;
pub use types::{
    Account, AccountPosition, BrokerOrder, ComplexStrategy, Instruction, OptionChain, OptionQuote,
    OptionRight, OrderDuration, OrderLeg, OrderStatus, OrderTicket, OrderType, Quote,
};
