//! Clock abstraction for zsnap.
//!
//! The rule engine reasons in whole minutes since the Unix epoch, while
//! snapshot names carry local wall-clock time. A `Clock` provides both the
//! current instant and the conversion between the two, so tests can pin
//! the time and the time zone.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone};

/// Trait for reading the current time and converting to/from local time.
pub trait Clock: Send + Sync {
    /// Returns the current time as Unix seconds since epoch.
    fn now_unix_sec(&self) -> u64;

    /// Converts Unix seconds to naive local wall-clock time.
    fn to_local(&self, unix_sec: i64) -> Option<NaiveDateTime>;

    /// Converts naive local wall-clock time to Unix seconds.
    ///
    /// Ambiguous local times resolve to the earliest instant; local times
    /// that do not exist in this zone return `None`.
    fn from_local(&self, local: &NaiveDateTime) -> Option<i64>;

    /// Returns the current time as whole minutes since epoch.
    fn now_unix_min(&self) -> i64 {
        i64::try_from(self.now_unix_sec() / 60).unwrap_or(i64::MAX)
    }

    /// Returns the current local wall-clock time.
    fn now_local(&self) -> Option<NaiveDateTime> {
        let secs = i64::try_from(self.now_unix_sec()).ok()?;
        self.to_local(secs)
    }
}

fn earliest<T>(result: LocalResult<T>) -> Option<T> {
    match result {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(first, _) => Some(first),
        LocalResult::None => None,
    }
}

/// Real system clock in the host time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_sec(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn to_local(&self, unix_sec: i64) -> Option<NaiveDateTime> {
        earliest(Local.timestamp_opt(unix_sec, 0)).map(|dt| dt.naive_local())
    }

    fn from_local(&self, local: &NaiveDateTime) -> Option<i64> {
        earliest(Local.from_local_datetime(local)).map(|dt| dt.timestamp())
    }
}

/// Mock clock with a fixed timestamp and a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    timestamp: u64,
    utc_offset_sec: i32,
}

impl MockClock {
    /// Create a mock clock at `timestamp` in UTC.
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            utc_offset_sec: 0,
        }
    }

    /// Create a mock clock whose current minute is `minutes` since epoch.
    pub fn at_minute(minutes: u64) -> Self {
        Self::new(minutes * 60)
    }

    /// Use a fixed offset east of UTC, in seconds, for local time.
    pub fn with_utc_offset_sec(mut self, utc_offset_sec: i32) -> Self {
        self.utc_offset_sec = utc_offset_sec;
        self
    }

    fn zone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_sec)
    }
}

impl Clock for MockClock {
    fn now_unix_sec(&self) -> u64 {
        self.timestamp
    }

    fn to_local(&self, unix_sec: i64) -> Option<NaiveDateTime> {
        earliest(self.zone()?.timestamp_opt(unix_sec, 0)).map(|dt| dt.naive_local())
    }

    fn from_local(&self, local: &NaiveDateTime) -> Option<i64> {
        earliest(self.zone()?.from_local_datetime(local)).map(|dt| dt.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, 0))
            .expect("valid date")
    }

    #[test]
    fn test_mock_clock_returns_fixed_timestamp() {
        let clock = MockClock::new(1234567890);
        assert_eq!(clock.now_unix_sec(), 1234567890);
    }

    #[test]
    fn test_mock_clock_minutes_floor() {
        assert_eq!(MockClock::new(119).now_unix_min(), 1);
        assert_eq!(MockClock::new(120).now_unix_min(), 2);
        assert_eq!(MockClock::at_minute(20825022).now_unix_min(), 20825022);
    }

    #[test]
    fn test_mock_clock_utc_round_trip() {
        let clock = MockClock::new(0);
        let epoch = local(1970, 1, 1, 0, 0);
        assert_eq!(clock.to_local(0), Some(epoch));
        assert_eq!(clock.from_local(&epoch), Some(0));
    }

    #[test]
    fn test_mock_clock_with_offset() {
        // 2009-08-05 21:42 at +02:00 is 19:42 UTC
        let clock = MockClock::new(0).with_utc_offset_sec(2 * 3600);
        let secs = clock.from_local(&local(2009, 8, 5, 21, 42)).expect("convert");
        assert_eq!(secs / 60, 20825022);
        assert_eq!(clock.to_local(secs), Some(local(2009, 8, 5, 21, 42)));
    }

    #[test]
    fn test_mock_clock_invalid_offset() {
        let clock = MockClock::new(0).with_utc_offset_sec(90_000);
        assert_eq!(clock.to_local(0), None);
        assert_eq!(clock.from_local(&local(2020, 1, 1, 0, 0)), None);
    }

    #[test]
    fn test_mock_clock_now_local() {
        let clock = MockClock::at_minute(20825022).with_utc_offset_sec(7200);
        assert_eq!(clock.now_local(), Some(local(2009, 8, 5, 21, 42)));
    }

    #[test]
    fn test_system_clock_returns_reasonable_time() {
        let now = SystemClock.now_unix_sec();
        // After 2020-01-01, before 2100-01-01
        assert!(now > 1577836800);
        assert!(now < 4102444800);
    }

    #[test]
    fn test_system_clock_local_round_trip() {
        let clock = SystemClock;
        let now = i64::try_from(clock.now_unix_sec()).expect("fits");
        let minute = now - now.rem_euclid(60);
        let local = clock.to_local(minute).expect("local");
        assert_eq!(clock.from_local(&local), Some(minute));
    }

    #[test]
    fn test_clock_trait_object() {
        let mock: Box<dyn Clock> = Box::new(MockClock::new(1234567890));
        assert_eq!(mock.now_unix_sec(), 1234567890);
        assert_eq!(mock.now_unix_min(), 20576131);
    }
}
