pub mod gex_repo;
pub mod order_repo;
pub mod position_repo;
pub mod quote_repo;

pub use gex_repo::GexSnapshotRepository;
pub use order_repo::OrderRepository;
pub use position_repo::PositionRepository;
pub use quote_repo::QuoteRepository;
