//! Periodic cadence matching.

/// Default cadence interval in minutes (hourly).
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// Default cadence offset in minutes (on the hour).
pub const DEFAULT_OFFSET_MINUTES: i64 = 0;

/// A repeating schedule: every `interval_minutes`, shifted by `offset_minutes`.
///
/// An interval of zero matches every minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceRule {
    pub interval_minutes: u32,
    pub offset_minutes: i64,
}

impl Default for CadenceRule {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            offset_minutes: DEFAULT_OFFSET_MINUTES,
        }
    }
}

impl CadenceRule {
    pub fn new(interval_minutes: u32, offset_minutes: i64) -> Self {
        Self {
            interval_minutes,
            offset_minutes,
        }
    }

    /// A cadence that matches every minute.
    pub fn always() -> Self {
        Self::new(0, 0)
    }

    /// Whether `minutes` (since epoch) falls on this cadence.
    ///
    /// Uses floored modulo so minutes before the offset still line up.
    pub fn matches(&self, minutes: i64) -> bool {
        if self.interval_minutes == 0 {
            return true;
        }
        // i128 keeps the subtraction exact for any pair of i64 inputs
        let shifted = i128::from(minutes) - i128::from(self.offset_minutes);
        shifted.rem_euclid(i128::from(self.interval_minutes)) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_hourly_on_the_hour() {
        let rule = CadenceRule::default();
        assert_eq!(rule, CadenceRule::new(60, 0));
        for t in [0, 60, 120] {
            assert!(rule.matches(t), "should match {t}");
        }
        for t in 1..=59 {
            assert!(!rule.matches(t), "should not match {t}");
        }
    }

    #[test]
    fn test_explicit_hourly_same_as_default() {
        let rule = CadenceRule::new(60, 0);
        assert!(rule.matches(0));
        assert!(rule.matches(120));
        assert!((1..=59).all(|t| !rule.matches(t)));
    }

    #[test]
    fn test_offset_shifts_phase() {
        let rule = CadenceRule::new(60, 4);
        for t in [4, 64, 124] {
            assert!(rule.matches(t), "should match {t}");
        }
        for t in 5..=63 {
            assert!(!rule.matches(t), "should not match {t}");
        }
    }

    #[test]
    fn test_times_before_offset_use_floored_modulo() {
        let rule = CadenceRule::new(60, 4);
        // -56 - 4 = -60, a multiple of 60
        assert!(rule.matches(-56));
        assert!(rule.matches(0 - 60 + 4));
        assert!(!rule.matches(0));
        assert!(!rule.matches(3));
    }

    #[test]
    fn test_offset_larger_than_interval() {
        let rule = CadenceRule::new(60, 1444);
        assert!(rule.matches(4));
        assert!(rule.matches(1444));
        assert!(!rule.matches(1440));
    }

    #[test]
    fn test_negative_offset() {
        let rule = CadenceRule::new(1440, -120);
        assert!(rule.matches(1320));
        assert!(rule.matches(2760));
        assert!(!rule.matches(1440));
    }

    #[test]
    fn test_zero_interval_always_matches() {
        let rule = CadenceRule::always();
        for t in [-1_000_000, -1, 0, 1, 59, 61, 20825022, i64::MAX, i64::MIN] {
            assert!(rule.matches(t));
        }
        assert!(CadenceRule::new(0, 17).matches(3));
    }

    #[test]
    fn test_matches_defining_equation() {
        for interval in [1u32, 2, 7, 15, 60, 1440] {
            for offset in [0i64, 1, 5, 59, 90] {
                let rule = CadenceRule::new(interval, offset);
                for t in 0..3000i64 {
                    let expected = (t - offset).rem_euclid(i64::from(interval)) == 0;
                    assert_eq!(rule.matches(t), expected, "{interval}/{offset} at {t}");
                }
            }
        }
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let rule = CadenceRule::new(u32::MAX, i64::MIN);
        let _ = rule.matches(i64::MAX);
        let rule = CadenceRule::new(1, i64::MAX);
        assert!(rule.matches(i64::MIN));
    }
}
