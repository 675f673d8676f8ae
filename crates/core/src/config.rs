use anyhow::{bail, Result};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub agent: AgentConfig,
    pub gex: GexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub api_url: String,
    pub access_token: String,
    pub account_hash: String,
}

/// Strategy parameters for the zero-DTE iron condor agent.
///
/// Times are wall-clock in the market time zone (America/Chicago).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Underlying symbol the condor is built on.
    pub symbol: String,
    /// Contract count per leg.
    pub quantity: Decimal,
    pub put_short_delta: Decimal,
    pub put_long_delta: Decimal,
    pub call_short_delta: Decimal,
    pub call_long_delta: Decimal,
    /// Close when profit percentage reaches this fraction (e.g. 0.9).
    pub profit_target_pct: Decimal,
    /// Close when loss percentage reaches this fraction (e.g. 0.7).
    pub loss_limit_pct: Decimal,
    /// Synthesize fills instead of placing brokerage orders.
    pub simulated: bool,
    pub trade_open: NaiveTime,
    pub opening_window_end: NaiveTime,
    pub close_time: NaiveTime,
    /// Liquidate everything this many minutes before `close_time`.
    pub close_lead_minutes: i64,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GexConfig {
    /// Symbols swept by the scheduled GEX capture.
    pub watchlist: Vec<String>,
    pub capture_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/zero_dte".to_string(),
                max_connections: 10,
            },
            broker: BrokerConfig {
                api_url: "https://api.schwabapi.com".to_string(),
                access_token: String::new(),
                account_hash: String::new(),
            },
            agent: AgentConfig::default(),
            gex: GexConfig::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            symbol: "QQQ".to_string(),
            quantity: Decimal::ONE,
            put_short_delta: Decimal::new(-40, 2),
            put_long_delta: Decimal::new(-10, 2),
            call_short_delta: Decimal::new(40, 2),
            call_long_delta: Decimal::new(10, 2),
            profit_target_pct: Decimal::new(90, 2),
            loss_limit_pct: Decimal::new(70, 2),
            simulated: true,
            trade_open: NaiveTime::from_hms_opt(8, 45, 0).unwrap(),
            opening_window_end: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            close_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            close_lead_minutes: 10,
            poll_interval_secs: 10,
        }
    }
}

impl Default for GexConfig {
    fn default() -> Self {
        Self {
            watchlist: vec![
                "QQQ".to_string(),
                "SPY".to_string(),
                "$SPX".to_string(),
                "IWM".to_string(),
            ],
            capture_interval_secs: 60,
        }
    }
}

impl AgentConfig {
    /// Validates strategy parameters. Called once at startup; a bad
    /// configuration is not recoverable at tick time.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("agent.symbol must not be empty");
        }
        if self.quantity <= Decimal::ZERO {
            bail!("agent.quantity must be positive, got {}", self.quantity);
        }
        for (name, delta) in [
            ("put_short_delta", self.put_short_delta),
            ("put_long_delta", self.put_long_delta),
        ] {
            if delta >= Decimal::ZERO || delta <= Decimal::NEGATIVE_ONE {
                bail!("agent.{name} must be in (-1, 0), got {delta}");
            }
        }
        for (name, delta) in [
            ("call_short_delta", self.call_short_delta),
            ("call_long_delta", self.call_long_delta),
        ] {
            if delta <= Decimal::ZERO || delta >= Decimal::ONE {
                bail!("agent.{name} must be in (0, 1), got {delta}");
            }
        }
        for (name, pct) in [
            ("profit_target_pct", self.profit_target_pct),
            ("loss_limit_pct", self.loss_limit_pct),
        ] {
            if pct <= Decimal::ZERO || pct > Decimal::ONE {
                bail!("agent.{name} must be in (0, 1], got {pct}");
            }
        }
        if self.trade_open >= self.opening_window_end {
            bail!("agent.trade_open must precede agent.opening_window_end");
        }
        if self.opening_window_end >= self.close_time {
            bail!("agent.opening_window_end must precede agent.close_time");
        }
        if self.close_lead_minutes < 0 {
            bail!(
                "agent.close_lead_minutes must not be negative, got {}",
                self.close_lead_minutes
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config_is_valid() {
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let config = AgentConfig {
            quantity: Decimal::ZERO,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_put_delta_with_wrong_sign() {
        let config = AgentConfig {
            put_short_delta: dec!(0.40),
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_windows() {
        let config = AgentConfig {
            trade_open: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            opening_window_end: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
