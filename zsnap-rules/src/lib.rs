//! Snapshot rule engine for zsnap.
//!
//! This crate provides:
//! - Cadence and preservation rules evaluated in minutes since epoch
//! - Snapshot name formatting and parsing
//! - Per-filesystem policies that decide what to create and what to prune
//! - `PolicySet`, the validated configuration for one run, with memoized
//!   pool busy state
//!
//! All backend access goes through `zsnap_zfs::Zfs` and all time through
//! `zsnap_clock::Clock`, so every decision can be tested with mocks.

pub mod cadence;
pub mod config;
pub mod policy;
pub mod policy_set;
pub mod pool;
pub mod preservation;
pub mod snapshot;

pub use cadence::CadenceRule;
pub use config::{CadenceConfig, ConfigError, FilesystemConfig, PolicyConfig, PreservationConfig};
pub use policy::{FilesystemPolicy, Operation, PolicyError};
pub use policy_set::{PolicySet, PoolStatusError};
pub use pool::PoolCharset;
pub use preservation::PreservationRule;
pub use snapshot::{format_snapshot_name, SnapshotError, SnapshotIdentity, TIMESTAMP_FORMAT};
