pub mod clock;
pub mod config;
pub mod config_loader;
pub mod retry;
pub mod ticker;

pub use clock::{Clock, SystemClock, MARKET_TZ};
pub use config::{AgentConfig, AppConfig, BrokerConfig, DatabaseConfig, GexConfig};
pub use config_loader::ConfigLoader;
pub use ticker::{InstrumentKind, TickerSymbol};
