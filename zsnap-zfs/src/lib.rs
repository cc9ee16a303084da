//! ZFS collaborator interface for zsnap.
//!
//! This crate provides:
//! - `Zfs` trait covering everything the rule engine needs from the storage
//!   backend (mount lookup, snapshot listing, create/destroy, pool status)
//! - `RealZfs`, which drives the `zfs` and `zpool` commands
//! - `MockZfs`, an in-memory backend that records every call

pub mod mock;
pub mod zfs;

pub use mock::{MockZfs, ZfsCall};
pub use zfs::{
    parse_mount_table, parse_pool_busy, validate_handle, validate_pool, RealZfs, Zfs,
    ZfsError, SNAPSHOT_DIR,
};
