//! Gamma exposure (GEX) aggregation.
//!
//! The engine is a pure function over option-contract quotes; the service
//! wraps it with expiration-date resolution, a scheduled watchlist sweep,
//! and snapshot persistence.

pub mod engine;
pub mod service;
pub mod types;

pub use engine::compute_total_gex;
pub use service::GexService;
pub use types::{StrikeGex, TotalGex};
