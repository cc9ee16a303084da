//! Per-filesystem policy: when to create, what to prune.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use zsnap_clock::Clock;
use zsnap_zfs::{Zfs, ZfsError};

use crate::cadence::CadenceRule;
use crate::config::{ConfigError, FilesystemConfig};
use crate::pool::PoolCharset;
use crate::preservation::PreservationRule;
use crate::snapshot::{SnapshotError, SnapshotIdentity};

/// Backend operation a policy was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Destroy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Destroy => "destroy",
        })
    }
}

/// Errors from evaluating or applying a filesystem policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{filesystem}: {operation}: {source}")]
    Snapshot {
        filesystem: String,
        operation: Operation,
        #[source]
        source: SnapshotError,
    },

    #[error("{filesystem}: {operation} failed: {source}")]
    Zfs {
        filesystem: String,
        operation: Operation,
        #[source]
        source: ZfsError,
    },
}

impl PolicyError {
    pub fn filesystem(&self) -> &str {
        match self {
            PolicyError::Snapshot { filesystem, .. } | PolicyError::Zfs { filesystem, .. } => {
                filesystem
            }
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            PolicyError::Snapshot { operation, .. } | PolicyError::Zfs { operation, .. } => {
                *operation
            }
        }
    }

    /// Whether this is a malformed managed snapshot name.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            PolicyError::Snapshot {
                source: SnapshotError::Parse { .. },
                ..
            }
        )
    }
}

/// Creation cadence and preservation rules for one managed filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemPolicy {
    pub filesystem_name: String,
    pub mount_point: PathBuf,
    pub creation_rule: CadenceRule,
    pub preservation_rules: Vec<PreservationRule>,
    pub recursive: bool,
}

impl FilesystemPolicy {
    /// Hourly creation, no preservation rules, not recursive.
    pub fn new(filesystem_name: impl Into<String>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            filesystem_name: filesystem_name.into(),
            mount_point: mount_point.into(),
            creation_rule: CadenceRule::default(),
            preservation_rules: Vec::new(),
            recursive: false,
        }
    }

    /// Builder: set the creation cadence.
    pub fn with_creation_rule(mut self, rule: CadenceRule) -> Self {
        self.creation_rule = rule;
        self
    }

    /// Builder: add a preservation rule.
    pub fn with_preservation_rule(mut self, rule: PreservationRule) -> Self {
        self.preservation_rules.push(rule);
        self
    }

    /// Builder: set the recursive flag passed to create and destroy.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Validate `config` and resolve the filesystem's mount point.
    pub fn from_config<Z: Zfs>(
        filesystem_name: &str,
        config: &FilesystemConfig,
        zfs: &Z,
    ) -> Result<Self, ConfigError> {
        let creation_rule = config
            .creation_rule
            .ok_or_else(|| ConfigError::MissingCreationRule(filesystem_name.to_string()))?;
        let preservation_rules: Vec<PreservationRule> = match &config.preservation_rules {
            Some(rules) if !rules.is_empty() => rules.iter().copied().map(Into::into).collect(),
            _ => {
                return Err(ConfigError::MissingPreservationRules(
                    filesystem_name.to_string(),
                ))
            }
        };
        let mount_point = zfs
            .mount_point(filesystem_name)
            .map_err(|source| ConfigError::MountLookup {
                filesystem: filesystem_name.to_string(),
                source,
            })?
            .ok_or_else(|| ConfigError::NotMounted(filesystem_name.to_string()))?;

        Ok(Self {
            filesystem_name: filesystem_name.to_string(),
            mount_point,
            creation_rule: creation_rule.into(),
            preservation_rules,
            recursive: config.recursive,
        })
    }

    /// Whether a snapshot is due at `now_minutes`.
    pub fn should_create(&self, now_minutes: i64) -> bool {
        self.creation_rule.matches(now_minutes)
    }

    /// Pool this filesystem belongs to, under `charset`.
    pub fn pool_id<'a>(&'a self, charset: &PoolCharset) -> &'a str {
        charset.pool_id(&self.filesystem_name)
    }

    /// Whether any preservation rule keeps `snapshot` at `now_minutes`.
    pub fn is_protected(&self, now_minutes: i64, snapshot: &SnapshotIdentity) -> bool {
        let created = snapshot.creation_time_minutes();
        self.preservation_rules
            .iter()
            .any(|rule| rule.protects(now_minutes, created))
    }

    /// The snapshots in `snapshots` that no preservation rule keeps.
    pub fn select_for_removal(
        &self,
        now_minutes: i64,
        snapshots: Vec<SnapshotIdentity>,
    ) -> Vec<SnapshotIdentity> {
        snapshots
            .into_iter()
            .filter(|snapshot| !self.is_protected(now_minutes, snapshot))
            .collect()
    }

    /// Managed snapshots of this filesystem, oldest first.
    ///
    /// Names without `prefix` are not ours and are skipped. A prefixed name
    /// with a malformed timestamp fails the whole listing.
    pub fn list_snapshots<Z: Zfs, C: Clock>(
        &self,
        prefix: &str,
        zfs: &Z,
        clock: &C,
    ) -> Result<Vec<SnapshotIdentity>, PolicyError> {
        let names = zfs
            .list_snapshots(&self.mount_point)
            .map_err(|source| self.zfs_error(Operation::List, source))?;

        let mut snapshots = names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| SnapshotIdentity::parse(name, &self.filesystem_name, prefix, clock))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| self.snapshot_error(Operation::List, source))?;

        snapshots.sort_by(|a, b| {
            a.creation_time_minutes()
                .cmp(&b.creation_time_minutes())
                .then_with(|| a.logical_name().cmp(b.logical_name()))
        });
        Ok(snapshots)
    }

    /// Managed snapshots that have aged out of every preservation rule.
    pub fn snapshots_to_remove<Z: Zfs, C: Clock>(
        &self,
        now_minutes: i64,
        prefix: &str,
        zfs: &Z,
        clock: &C,
    ) -> Result<Vec<SnapshotIdentity>, PolicyError> {
        let snapshots = self.list_snapshots(prefix, zfs, clock)?;
        Ok(self.select_for_removal(now_minutes, snapshots))
    }

    /// The snapshot `create_snapshot` would take at `now_minutes`, if due.
    pub fn planned_snapshot<C: Clock>(
        &self,
        now_minutes: i64,
        prefix: &str,
        clock: &C,
    ) -> Result<Option<SnapshotIdentity>, PolicyError> {
        if !self.should_create(now_minutes) {
            return Ok(None);
        }
        SnapshotIdentity::new_snapshot(&self.filesystem_name, prefix, now_minutes, clock)
            .map(Some)
            .map_err(|source| self.snapshot_error(Operation::Create, source))
    }

    /// Take a snapshot if one is due. Returns the snapshot taken.
    pub fn create_snapshot<Z: Zfs, C: Clock>(
        &self,
        now_minutes: i64,
        prefix: &str,
        zfs: &Z,
        clock: &C,
    ) -> Result<Option<SnapshotIdentity>, PolicyError> {
        let Some(snapshot) = self.planned_snapshot(now_minutes, prefix, clock)? else {
            return Ok(None);
        };
        let handle = snapshot
            .canonical_name()
            .map_err(|source| self.snapshot_error(Operation::Create, source))?;
        zfs.create_snapshot(&handle, self.recursive)
            .map_err(|source| self.zfs_error(Operation::Create, source))?;
        Ok(Some(snapshot))
    }

    /// Destroy every snapshot returned by `snapshots_to_remove`, oldest
    /// first. Stops at the first failure. Returns the snapshots destroyed.
    pub fn remove_snapshots<Z: Zfs, C: Clock>(
        &self,
        now_minutes: i64,
        prefix: &str,
        zfs: &Z,
        clock: &C,
    ) -> Result<Vec<SnapshotIdentity>, PolicyError> {
        let doomed = self.snapshots_to_remove(now_minutes, prefix, zfs, clock)?;
        for snapshot in &doomed {
            let handle = snapshot
                .canonical_name()
                .map_err(|source| self.snapshot_error(Operation::Destroy, source))?;
            zfs.destroy_snapshot(&handle, self.recursive)
                .map_err(|source| self.zfs_error(Operation::Destroy, source))?;
        }
        Ok(doomed)
    }

    fn zfs_error(&self, operation: Operation, source: ZfsError) -> PolicyError {
        PolicyError::Zfs {
            filesystem: self.filesystem_name.clone(),
            operation,
            source,
        }
    }

    fn snapshot_error(&self, operation: Operation, source: SnapshotError) -> PolicyError {
        PolicyError::Snapshot {
            filesystem: self.filesystem_name.clone(),
            operation,
            source,
        }
    }
}
