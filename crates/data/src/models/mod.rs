pub mod order_leg;
pub mod position;
pub mod quote;

pub use order_leg::OrderLegRecord;
pub use position::PositionRecord;
pub use quote::MarkRecord;
