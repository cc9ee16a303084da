//! The `Zfs` collaborator trait and its command-line implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Directory, relative to a mount point, holding the snapshot namespace.
pub const SNAPSHOT_DIR: &str = ".zfs/snapshot";

/// Errors from storage backend operations.
#[derive(Debug, Error)]
pub enum ZfsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("invalid snapshot handle: {0:?}")]
    InvalidHandle(String),

    #[error("invalid pool name: {0:?}")]
    InvalidPool(String),
}

/// Operations the rule engine needs from the storage backend.
/// Abstracted for testing with mock implementations.
pub trait Zfs: Send + Sync {
    /// Current mount path of `filesystem`, or `None` if it is not mounted.
    fn mount_point(&self, filesystem: &str) -> Result<Option<PathBuf>, ZfsError>;

    /// Raw names present in the snapshot namespace of the filesystem
    /// mounted at `mount_point`.
    fn list_snapshots(&self, mount_point: &Path) -> Result<Vec<String>, ZfsError>;

    /// Create the snapshot addressed by `handle` (`filesystem@name`).
    fn create_snapshot(&self, handle: &str, recursive: bool) -> Result<(), ZfsError>;

    /// Destroy the snapshot addressed by `handle` (`filesystem@name`).
    fn destroy_snapshot(&self, handle: &str, recursive: bool) -> Result<(), ZfsError>;

    /// Whether a scrub or resilver is currently running on `pool`.
    fn pool_busy(&self, pool: &str) -> Result<bool, ZfsError>;
}

/// Reject handles that would be misread as options or split into
/// several arguments by the `zfs` command.
pub fn validate_handle(handle: &str) -> Result<(), ZfsError> {
    let well_formed = handle.matches('@').count() == 1
        && !handle.starts_with('-')
        && !handle.starts_with('@')
        && !handle.ends_with('@')
        && !handle.chars().any(char::is_whitespace);
    if well_formed {
        Ok(())
    } else {
        Err(ZfsError::InvalidHandle(handle.to_string()))
    }
}

/// Reject pool names that `zpool` would take for an option.
pub fn validate_pool(pool: &str) -> Result<(), ZfsError> {
    if pool.is_empty() || pool.starts_with('-') || pool.chars().any(char::is_whitespace) {
        Err(ZfsError::InvalidPool(pool.to_string()))
    } else {
        Ok(())
    }
}

/// Find the mount point of `filesystem` in `zfs mount` output.
///
/// Each line is `<filesystem> <mount point>`; the first line whose first
/// field is `filesystem` wins.
pub fn parse_mount_table(output: &str, filesystem: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        if name != filesystem {
            return None;
        }
        fields.last().map(PathBuf::from)
    })
}

/// Whether `zpool status` output reports a scrub or resilver in progress.
pub fn parse_pool_busy(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.contains("scrub in progress") || line.contains("resilver in progress"))
}

/// Backend that shells out to the `zfs` and `zpool` commands.
#[derive(Debug, Clone)]
pub struct RealZfs {
    zfs_bin: PathBuf,
    zpool_bin: PathBuf,
}

impl Default for RealZfs {
    fn default() -> Self {
        Self::new("zfs", "zpool")
    }
}

impl RealZfs {
    /// Create a backend using the given `zfs` and `zpool` executables.
    pub fn new(zfs_bin: impl Into<PathBuf>, zpool_bin: impl Into<PathBuf>) -> Self {
        Self {
            zfs_bin: zfs_bin.into(),
            zpool_bin: zpool_bin.into(),
        }
    }

    fn run(&self, bin: &Path, args: &[&str]) -> Result<String, ZfsError> {
        let output = Command::new(bin).args(args).output()?;
        if !output.status.success() {
            let mut command = bin.display().to_string();
            for arg in args {
                command.push(' ');
                command.push_str(arg);
            }
            return Err(ZfsError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_on_snapshot(&self, verb: &str, handle: &str, recursive: bool) -> Result<(), ZfsError> {
        validate_handle(handle)?;
        let mut args = vec![verb];
        if recursive {
            args.push("-r");
        }
        args.push(handle);
        self.run(&self.zfs_bin, &args).map(|_| ())
    }
}

impl Zfs for RealZfs {
    fn mount_point(&self, filesystem: &str) -> Result<Option<PathBuf>, ZfsError> {
        let output = self.run(&self.zfs_bin, &["mount"])?;
        Ok(parse_mount_table(&output, filesystem))
    }

    fn list_snapshots(&self, mount_point: &Path) -> Result<Vec<String>, ZfsError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(mount_point.join(SNAPSHOT_DIR))? {
            let entry = entry?;
            // Non-UTF-8 names cannot carry our prefix
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn create_snapshot(&self, handle: &str, recursive: bool) -> Result<(), ZfsError> {
        self.run_on_snapshot("snapshot", handle, recursive)
    }

    fn destroy_snapshot(&self, handle: &str, recursive: bool) -> Result<(), ZfsError> {
        self.run_on_snapshot("destroy", handle, recursive)
    }

    fn pool_busy(&self, pool: &str) -> Result<bool, ZfsError> {
        validate_pool(pool)?;
        let output = self.run(&self.zpool_bin, &["status", pool])?;
        Ok(parse_pool_busy(&output))
    }
}
