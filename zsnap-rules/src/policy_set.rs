//! The full set of managed filesystems and the pools they live on.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use thiserror::Error;
use zsnap_zfs::{validate_pool, Zfs, ZfsError};

use crate::config::{ConfigError, PolicyConfig};
use crate::policy::FilesystemPolicy;
use crate::pool::PoolCharset;

/// A pool status query failed.
#[derive(Debug, Error)]
#[error("failed to query status of pool {pool}: {source}")]
pub struct PoolStatusError {
    pub pool: String,
    #[source]
    pub source: ZfsError,
}

/// Validated policies for one run.
///
/// Pool busy state is queried at most once per `PolicySet`; later calls
/// reuse the first answer.
#[derive(Debug)]
pub struct PolicySet {
    snapshot_prefix: String,
    charset: PoolCharset,
    filesystems: Vec<FilesystemPolicy>,
    pools: Vec<String>,
    busy_pools: OnceCell<BTreeSet<String>>,
}

impl PolicySet {
    /// Build a set from already constructed policies.
    pub fn new(
        snapshot_prefix: impl Into<String>,
        charset: PoolCharset,
        filesystems: Vec<FilesystemPolicy>,
    ) -> Result<Self, ConfigError> {
        let snapshot_prefix = snapshot_prefix.into();
        if snapshot_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }

        let mut pools: Vec<String> = Vec::new();
        for policy in &filesystems {
            let pool = policy.pool_id(&charset);
            if pool.is_empty() {
                return Err(ConfigError::NoPoolId(policy.filesystem_name.clone()));
            }
            if validate_pool(pool).is_err() {
                return Err(ConfigError::InvalidPoolId {
                    filesystem: policy.filesystem_name.clone(),
                    pool: pool.to_string(),
                });
            }
            if !pools.iter().any(|p| p == pool) {
                pools.push(pool.to_string());
            }
        }

        Ok(Self {
            snapshot_prefix,
            charset,
            filesystems,
            pools,
            busy_pools: OnceCell::new(),
        })
    }

    /// Validate `config` and resolve every filesystem's mount point.
    pub fn from_config<Z: Zfs>(config: &PolicyConfig, zfs: &Z) -> Result<Self, ConfigError> {
        if config.snapshot_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        let filesystems = config
            .filesystems
            .iter()
            .map(|(name, fs)| FilesystemPolicy::from_config(name, fs, zfs))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            config.snapshot_prefix.clone(),
            PoolCharset::with_extra(&config.pool_name_chars),
            filesystems,
        )
    }

    pub fn snapshot_prefix(&self) -> &str {
        &self.snapshot_prefix
    }

    pub fn filesystems(&self) -> &[FilesystemPolicy] {
        &self.filesystems
    }

    /// Distinct pool ids, in filesystem order.
    pub fn pools(&self) -> &[String] {
        &self.pools
    }

    pub fn pool_of<'a>(&self, policy: &'a FilesystemPolicy) -> &'a str {
        policy.pool_id(&self.charset)
    }

    /// Pools currently scrubbing or resilvering.
    ///
    /// The first call queries every pool; a failure leaves nothing cached
    /// so the next call queries again.
    pub fn busy_pools<Z: Zfs>(&self, zfs: &Z) -> Result<&BTreeSet<String>, PoolStatusError> {
        if let Some(busy) = self.busy_pools.get() {
            return Ok(busy);
        }
        let mut busy = BTreeSet::new();
        for pool in &self.pools {
            let is_busy = zfs.pool_busy(pool).map_err(|source| PoolStatusError {
                pool: pool.clone(),
                source,
            })?;
            if is_busy {
                busy.insert(pool.clone());
            }
        }
        Ok(self.busy_pools.get_or_init(|| busy))
    }

    /// Whether the pool of `policy` is busy.
    pub fn is_busy<Z: Zfs>(
        &self,
        policy: &FilesystemPolicy,
        zfs: &Z,
    ) -> Result<bool, PoolStatusError> {
        Ok(self.busy_pools(zfs)?.contains(self.pool_of(policy)))
    }
}
