use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, Utc};

pub const SECOND_MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Source of "now" for everything that depends on wall-clock time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// The current wall-clock date and time in the device's local zone.
    fn now_local(&self) -> NaiveDateTime;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock pinned to a fixed UTC offset.
#[derive(Debug)]
pub struct FakeClock {
    now_ms: AtomicI64,
    offset: FixedOffset,
}

impl FakeClock {
    pub fn new(now_ms: i64) -> Self {
        Self::with_offset(now_ms, Utc.fix())
    }

    pub fn with_offset(now_ms: i64, offset: FixedOffset) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
            offset,
        }
    }

    /// Clock whose local time reads `local`, interpreted in `offset`.
    pub fn at_local(local: NaiveDateTime, offset: FixedOffset) -> Self {
        let utc_ms =
            local.and_utc().timestamp_millis() - i64::from(offset.local_minus_utc()) * SECOND_MS;
        Self::with_offset(utc_ms, offset)
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn now_local(&self) -> NaiveDateTime {
        let utc = DateTime::<Utc>::from_timestamp_millis(self.now_ms()).unwrap_or_default();
        utc.with_timezone(&self.offset).naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn fake_clock_reports_local_time_in_its_offset() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let local = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let clock = FakeClock::at_local(local, offset);
        assert_eq!(clock.now_local(), local);

        clock.advance_ms(HOUR_MS);
        assert_eq!(clock.now_local().hour(), 11);
    }

    #[test]
    fn fake_clock_set_and_advance() {
        let clock = FakeClock::new(0);
        clock.advance_ms(DAY_MS);
        assert_eq!(clock.now_ms(), DAY_MS);
        clock.set_ms(5);
        assert_eq!(clock.now_ms(), 5);
    }
}
