//! Timer loop driving the strategy controller.

use std::time::Duration;

use anyhow::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::controller::StrategyController;

/// Owns the controller and ticks it on a fixed interval from one task.
/// That ownership is what guarantees ticks never overlap.
pub struct StrategyService {
    controller: StrategyController,
}

impl StrategyService {
    #[must_use]
    pub fn new(controller: StrategyController) -> Self {
        Self { controller }
    }

    /// Rehydrates persisted state, then ticks until the task is dropped.
    ///
    /// # Errors
    /// Returns an error only when rehydration fails; individual tick
    /// failures are logged and retried on the next interval.
    pub async fn run(mut self) -> Result<()> {
        self.controller.rehydrate().await?;
        let period = Duration::from_secs(self.controller.config().poll_interval_secs.max(1));
        info!(
            symbol = %self.controller.config().symbol,
            period_secs = period.as_secs(),
            simulated = self.controller.config().simulated,
            "Strategy agent started"
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.controller.tick().await {
                error!(error = %e, "Strategy tick failed");
            }
        }
    }
}
