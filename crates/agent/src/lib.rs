//! Zero-DTE iron condor strategy agent.
//!
//! One [`StrategyController`] owns a trading session end to end: it opens a
//! four-leg condor by delta targets inside the morning window, polls the
//! order to a fill, then hands the open position to the
//! [`PositionMonitor`] until a profit/loss threshold or the forced-close
//! deadline liquidates it. [`StrategyService`] drives the controller on a
//! timer from a single task, so ticks never overlap.

pub mod condor;
pub mod controller;
pub mod monitor;
pub mod selector;
pub mod service;

pub use condor::{build_iron_condor_order, select_iron_condor, CondorError, IronCondorLegs};
pub use controller::{StrategyController, StrategyState};
pub use monitor::PositionMonitor;
pub use selector::find_contract;
pub use service::StrategyService;
