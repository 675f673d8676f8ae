//! Persistence gateway for the zero-DTE agent.
//!
//! Store traits are the seams the strategy controller and GEX capture talk
//! to; Postgres repositories implement them for production, and
//! [`memory::InMemoryStore`] backs simulated runs and tests.

pub mod database;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use database::DatabaseClient;
pub use memory::InMemoryStore;
pub use models::{MarkRecord, OrderLegRecord, PositionRecord};
pub use store::{GexSnapshotStore, OrderStore, PositionStore, QuoteStore};
