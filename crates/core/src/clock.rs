//! Injectable wall-clock so time-window rules stay unit-testable.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::Chicago;
use chrono_tz::Tz;

/// The fixed market time zone all trading windows are evaluated in.
pub const MARKET_TZ: Tz = Chicago;

pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant in the market time zone.
    fn now_market(&self) -> DateTime<Tz> {
        self.now_utc().with_timezone(&MARKET_TZ)
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pins the clock to the given market-local date and time.
    #[must_use]
    pub fn at_market(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Self {
        let local = MARKET_TZ
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .expect("unambiguous market-local instant");
        Self(local.with_timezone(&Utc))
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn fixed_clock_reports_market_local_time() {
        let clock = FixedClock::at_market(2025, 6, 16, 9, 0, 0);
        let market = clock.now_market();
        assert_eq!(market.hour(), 9);
        assert_eq!(market.minute(), 0);
    }
}
