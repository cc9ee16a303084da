//! Snapshot naming.
//!
//! Managed snapshots are named `<prefix>YYYY-MM-DD_HH.MM` in local time.
//! The name is the only record of when a snapshot was taken, so the format
//! is written and parsed here and must stay stable.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use zsnap_clock::Clock;

/// chrono format of the timestamp part of a snapshot name.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H.%M";

/// Errors from snapshot name handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("malformed snapshot name {name:?}: {reason}")]
    Parse { name: String, reason: String },

    #[error("snapshot has no {0}")]
    MissingField(&'static str),

    #[error("current time has no local representation")]
    NoLocalTime,
}

/// A managed snapshot: its name, its filesystem and when it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotIdentity {
    logical_name: String,
    filesystem_name: String,
    created_local: NaiveDateTime,
    created_unix_sec: i64,
}

impl SnapshotIdentity {
    /// Parse `name` (which must start with `prefix`) as a snapshot of
    /// `filesystem`, reading its timestamp as local time of `clock`.
    pub fn parse<C: Clock>(
        name: &str,
        filesystem: &str,
        prefix: &str,
        clock: &C,
    ) -> Result<Self, SnapshotError> {
        let parse_error = |reason: String| SnapshotError::Parse {
            name: name.to_string(),
            reason,
        };

        let stamp = name
            .strip_prefix(prefix)
            .ok_or_else(|| parse_error(format!("does not start with {prefix:?}")))?;
        let created_local = parse_timestamp(stamp).map_err(parse_error)?;
        let created_unix_sec = clock
            .from_local(&created_local)
            .ok_or_else(|| parse_error("local time does not exist".to_string()))?;

        Ok(Self {
            logical_name: name.to_string(),
            filesystem_name: filesystem.to_string(),
            created_local,
            created_unix_sec,
        })
    }

    /// Identity for a new snapshot of `filesystem` taken at `now_minutes`,
    /// named in the local time of `clock`. The clock is not read again.
    pub fn new_snapshot<C: Clock>(
        filesystem: &str,
        prefix: &str,
        now_minutes: i64,
        clock: &C,
    ) -> Result<Self, SnapshotError> {
        let now = now_minutes
            .checked_mul(60)
            .and_then(|sec| clock.to_local(sec))
            .ok_or(SnapshotError::NoLocalTime)?;
        let name = format_snapshot_name(prefix, &now);
        Self::parse(&name, filesystem, prefix, clock)
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn filesystem_name(&self) -> &str {
        &self.filesystem_name
    }

    /// Creation time as written in the name.
    pub fn created_local(&self) -> NaiveDateTime {
        self.created_local
    }

    /// Creation time in whole minutes since epoch.
    pub fn creation_time_minutes(&self) -> i64 {
        self.created_unix_sec.div_euclid(60)
    }

    /// The `filesystem@snapshot` handle accepted by `zfs`.
    pub fn canonical_name(&self) -> Result<String, SnapshotError> {
        if self.filesystem_name.is_empty() {
            return Err(SnapshotError::MissingField("filesystem name"));
        }
        if self.logical_name.is_empty() {
            return Err(SnapshotError::MissingField("snapshot name"));
        }
        Ok(format!("{}@{}", self.filesystem_name, self.logical_name))
    }
}

impl fmt::Display for SnapshotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.filesystem_name, self.logical_name)
    }
}

/// Format a snapshot name for `local` time.
pub fn format_snapshot_name(prefix: &str, local: &NaiveDateTime) -> String {
    format!("{}{}", prefix, local.format(TIMESTAMP_FORMAT))
}

fn number<T: std::str::FromStr>(field: &str, text: &str) -> Result<T, String> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{field} {text:?} is not a number"));
    }
    text.parse()
        .map_err(|_| format!("{field} {text:?} is out of range"))
}

fn in_range(field: &str, value: u32, min: u32, max: u32) -> Result<u32, String> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{field} {value} is not within {min}..={max}"))
    }
}

/// Parse `YYYY-MM-DD_HH.MM` into a naive local timestamp.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, String> {
    let parts: Vec<&str> = text.split('_').collect();
    let [date, time] = parts[..] else {
        return Err(format!("expected DATE_TIME, got {text:?}"));
    };

    let date_parts: Vec<&str> = date.split('-').collect();
    let [year, month, day] = date_parts[..] else {
        return Err(format!("expected YYYY-MM-DD, got {date:?}"));
    };

    let time_parts: Vec<&str> = time.split('.').collect();
    let [hour, minute] = time_parts[..] else {
        return Err(format!("expected HH.MM, got {time:?}"));
    };

    let year: i32 = number("year", year)?;
    let month = in_range("month", number("month", month)?, 1, 12)?;
    let day = in_range("day", number("day", day)?, 1, 31)?;
    let hour = in_range("hour", number("hour", hour)?, 0, 23)?;
    let minute = in_range("minute", number("minute", minute)?, 0, 59)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("{date} is not a calendar date"))?
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("{time} is not a time of day"))
}
