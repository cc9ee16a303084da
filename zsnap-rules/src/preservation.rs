//! Preservation windows.

use crate::cadence::CadenceRule;

/// Default retention window in minutes.
pub const DEFAULT_RETENTION_MINUTES: u64 = 240;

/// Keeps snapshots younger than `retention_minutes` whose creation minute
/// falls on `cadence`.
///
/// The cadence is evaluated against the snapshot's creation time, not the
/// evaluation time, so "hourly for a day" and "daily for a week" can be
/// expressed as two independent rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreservationRule {
    pub cadence: CadenceRule,
    pub retention_minutes: u64,
}

impl Default for PreservationRule {
    fn default() -> Self {
        Self {
            cadence: CadenceRule::default(),
            retention_minutes: DEFAULT_RETENTION_MINUTES,
        }
    }
}

impl PreservationRule {
    pub fn new(cadence: CadenceRule, retention_minutes: u64) -> Self {
        Self {
            cadence,
            retention_minutes,
        }
    }

    /// Whether a snapshot created at `created_minutes` is younger than the
    /// retention window at `now_minutes`. Age equal to the window is expired.
    ///
    /// Snapshots dated in the future have a negative age and are inside
    /// the window.
    pub fn within_retention(&self, now_minutes: i64, created_minutes: i64) -> bool {
        let age = i128::from(now_minutes) - i128::from(created_minutes);
        age < i128::from(self.retention_minutes)
    }

    /// Whether this rule keeps a snapshot created at `created_minutes`.
    pub fn protects(&self, now_minutes: i64, created_minutes: i64) -> bool {
        self.within_retention(now_minutes, created_minutes)
            && self.cadence.matches(created_minutes)
    }
}
