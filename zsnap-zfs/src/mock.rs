//! In-memory `Zfs` backend for tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::zfs::{validate_handle, validate_pool, Zfs, ZfsError};

/// A call received by `MockZfs`, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZfsCall {
    MountPoint(String),
    ListSnapshots(PathBuf),
    Create { handle: String, recursive: bool },
    Destroy { handle: String, recursive: bool },
    PoolStatus(String),
}

#[derive(Debug, Default)]
struct MockState {
    mounts: HashMap<String, PathBuf>,
    snapshots: HashMap<PathBuf, BTreeSet<String>>,
    busy_pools: HashSet<String>,
    fail_mount_lookup: bool,
    fail_list: HashSet<PathBuf>,
    fail_create: HashSet<String>,
    fail_destroy: HashSet<String>,
    fail_pool_status: HashSet<String>,
    calls: Vec<ZfsCall>,
}

/// Mock backend for testing.
/// Cloning creates a new handle to the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MockZfs {
    state: Arc<RwLock<MockState>>,
}

fn failure(command: String, stderr: &str) -> ZfsError {
    ZfsError::CommandFailed {
        command,
        status: "exit status: 1".to_string(),
        stderr: stderr.to_string(),
    }
}

impl MockZfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `filesystem` at `mount_point` with an empty snapshot namespace.
    pub fn add_filesystem(&self, filesystem: &str, mount_point: impl Into<PathBuf>) {
        let mount_point = mount_point.into();
        let mut state = self.state.write().unwrap();
        state.snapshots.entry(mount_point.clone()).or_default();
        state.mounts.insert(filesystem.to_string(), mount_point);
    }

    /// Add a raw snapshot name under the filesystem's mount point.
    pub fn add_snapshot(&self, filesystem: &str, name: &str) {
        let mut state = self.state.write().unwrap();
        let mount = state.mounts.get(filesystem).cloned();
        if let Some(mount) = mount {
            state.snapshots.entry(mount).or_default().insert(name.to_string());
        }
    }

    /// Snapshot names currently present on `filesystem`, sorted.
    pub fn snapshots_of(&self, filesystem: &str) -> Vec<String> {
        let state = self.state.read().unwrap();
        state
            .mounts
            .get(filesystem)
            .and_then(|mount| state.snapshots.get(mount))
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_pool_busy(&self, pool: &str, busy: bool) {
        let mut state = self.state.write().unwrap();
        if busy {
            state.busy_pools.insert(pool.to_string());
        } else {
            state.busy_pools.remove(pool);
        }
    }

    /// Make every mount lookup fail.
    pub fn fail_mount_lookup(&self) {
        self.state.write().unwrap().fail_mount_lookup = true;
    }

    /// Make listing the snapshots of `filesystem` fail.
    pub fn fail_list(&self, filesystem: &str) {
        let mut state = self.state.write().unwrap();
        let mount = state.mounts.get(filesystem).cloned();
        if let Some(mount) = mount {
            state.fail_list.insert(mount);
        }
    }

    /// Make every snapshot creation on `filesystem` fail.
    pub fn fail_create(&self, filesystem: &str) {
        self.state.write().unwrap().fail_create.insert(filesystem.to_string());
    }

    /// Make destroying `handle` fail.
    pub fn fail_destroy(&self, handle: &str) {
        self.state.write().unwrap().fail_destroy.insert(handle.to_string());
    }

    /// Make the status query for `pool` fail.
    pub fn fail_pool_status(&self, pool: &str) {
        self.state.write().unwrap().fail_pool_status.insert(pool.to_string());
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<ZfsCall> {
        self.state.read().unwrap().calls.clone()
    }

    /// Number of status queries issued for `pool`.
    pub fn pool_status_queries(&self, pool: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ZfsCall::PoolStatus(p) if p == pool))
            .count()
    }

    /// Handles passed to `create_snapshot`, in order.
    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ZfsCall::Create { handle, .. } => Some(handle),
                _ => None,
            })
            .collect()
    }

    /// Handles passed to `destroy_snapshot`, in order.
    pub fn destroyed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ZfsCall::Destroy { handle, .. } => Some(handle),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ZfsCall) {
        self.state.write().unwrap().calls.push(call);
    }
}

impl Zfs for MockZfs {
    fn mount_point(&self, filesystem: &str) -> Result<Option<PathBuf>, ZfsError> {
        self.record(ZfsCall::MountPoint(filesystem.to_string()));
        let state = self.state.read().unwrap();
        if state.fail_mount_lookup {
            return Err(failure("zfs mount".to_string(), "mock mount lookup failure"));
        }
        Ok(state.mounts.get(filesystem).cloned())
    }

    fn list_snapshots(&self, mount_point: &Path) -> Result<Vec<String>, ZfsError> {
        self.record(ZfsCall::ListSnapshots(mount_point.to_path_buf()));
        let state = self.state.read().unwrap();
        if state.fail_list.contains(mount_point) {
            return Err(ZfsError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("mock list failure: {}", mount_point.display()),
            )));
        }
        match state.snapshots.get(mount_point) {
            Some(names) => Ok(names.iter().cloned().collect()),
            None => Err(ZfsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no snapshot directory under {}", mount_point.display()),
            ))),
        }
    }

    fn create_snapshot(&self, handle: &str, recursive: bool) -> Result<(), ZfsError> {
        self.record(ZfsCall::Create {
            handle: handle.to_string(),
            recursive,
        });
        validate_handle(handle)?;
        let command = format!("zfs snapshot {handle}");
        let (filesystem, name) = handle
            .split_once('@')
            .ok_or_else(|| ZfsError::InvalidHandle(handle.to_string()))?;

        let mut state = self.state.write().unwrap();
        if state.fail_create.contains(filesystem) {
            return Err(failure(command, "mock create failure"));
        }
        let mount = match state.mounts.get(filesystem) {
            Some(mount) => mount.clone(),
            None => return Err(failure(command, "dataset does not exist")),
        };
        if !state.snapshots.entry(mount).or_default().insert(name.to_string()) {
            return Err(failure(command, "dataset already exists"));
        }
        Ok(())
    }

    fn destroy_snapshot(&self, handle: &str, recursive: bool) -> Result<(), ZfsError> {
        self.record(ZfsCall::Destroy {
            handle: handle.to_string(),
            recursive,
        });
        validate_handle(handle)?;
        let command = format!("zfs destroy {handle}");
        let (filesystem, name) = handle
            .split_once('@')
            .ok_or_else(|| ZfsError::InvalidHandle(handle.to_string()))?;

        let mut state = self.state.write().unwrap();
        if state.fail_destroy.contains(handle) {
            return Err(failure(command, "dataset is busy"));
        }
        let mount = state.mounts.get(filesystem).cloned();
        let removed = match mount {
            Some(mount) => state
                .snapshots
                .get_mut(&mount)
                .map_or(false, |names| names.remove(name)),
            None => false,
        };
        if !removed {
            return Err(failure(command, "could not find any snapshots to destroy"));
        }
        Ok(())
    }

    fn pool_busy(&self, pool: &str) -> Result<bool, ZfsError> {
        self.record(ZfsCall::PoolStatus(pool.to_string()));
        validate_pool(pool)?;
        let state = self.state.read().unwrap();
        if state.fail_pool_status.contains(pool) {
            return Err(failure(format!("zpool status {pool}"), "no such pool"));
        }
        Ok(state.busy_pools.contains(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock() -> MockZfs {
        let zfs = MockZfs::new();
        zfs.add_filesystem("tank/usr", "/usr");
        zfs
    }

    #[test]
    fn test_mount_point_known_and_unknown() {
        let zfs = mock();
        assert_eq!(zfs.mount_point("tank/usr").unwrap(), Some(PathBuf::from("/usr")));
        assert_eq!(zfs.mount_point("tank/var").unwrap(), None);
    }

    #[test]
    fn test_create_then_list() {
        let zfs = mock();
        zfs.create_snapshot("tank/usr@a", false).expect("create");
        zfs.create_snapshot("tank/usr@b", true).expect("create");

        let names = zfs.list_snapshots(Path::new("/usr")).expect("list");
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(zfs.created(), vec!["tank/usr@a", "tank/usr@b"]);
        assert!(zfs.calls().contains(&ZfsCall::Create {
            handle: "tank/usr@b".to_string(),
            recursive: true
        }));
    }

    #[test]
    fn test_create_duplicate_fails() {
        let zfs = mock();
        zfs.add_snapshot("tank/usr", "a");
        let result = zfs.create_snapshot("tank/usr@a", false);
        assert!(matches!(result, Err(ZfsError::CommandFailed { .. })));
    }

    #[test]
    fn test_create_on_unknown_filesystem_fails() {
        let zfs = mock();
        assert!(zfs.create_snapshot("tank/var@a", false).is_err());
    }

    #[test]
    fn test_destroy_removes_snapshot() {
        let zfs = mock();
        zfs.add_snapshot("tank/usr", "a");
        zfs.add_snapshot("tank/usr", "b");

        zfs.destroy_snapshot("tank/usr@a", false).expect("destroy");

        assert_eq!(zfs.snapshots_of("tank/usr"), vec!["b"]);
        assert_eq!(zfs.destroyed(), vec!["tank/usr@a"]);
    }

    #[test]
    fn test_destroy_missing_snapshot_fails() {
        let zfs = mock();
        assert!(zfs.destroy_snapshot("tank/usr@nope", false).is_err());
    }

    #[test]
    fn test_injected_failures() {
        let zfs = mock();
        zfs.add_snapshot("tank/usr", "a");
        zfs.fail_destroy("tank/usr@a");
        zfs.fail_create("tank/usr");
        zfs.fail_list("tank/usr");
        zfs.fail_pool_status("tank");

        assert!(zfs.destroy_snapshot("tank/usr@a", false).is_err());
        assert!(zfs.create_snapshot("tank/usr@b", false).is_err());
        assert!(zfs.list_snapshots(Path::new("/usr")).is_err());
        assert!(zfs.pool_busy("tank").is_err());
        // Failed destroy leaves the snapshot in place
        assert_eq!(zfs.snapshots_of("tank/usr"), vec!["a"]);
    }

    #[test]
    fn test_fail_mount_lookup() {
        let zfs = mock();
        zfs.fail_mount_lookup();
        assert!(zfs.mount_point("tank/usr").is_err());
    }

    #[test]
    fn test_list_unknown_mount_is_not_found() {
        let zfs = mock();
        match zfs.list_snapshots(Path::new("/nowhere")) {
            Err(ZfsError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_pool_busy_and_query_count() {
        let zfs = mock();
        zfs.set_pool_busy("tank", true);
        assert!(zfs.pool_busy("tank").unwrap());
        assert!(!zfs.pool_busy("backup").unwrap());
        zfs.set_pool_busy("tank", false);
        assert!(!zfs.pool_busy("tank").unwrap());
        assert_eq!(zfs.pool_status_queries("tank"), 2);
        assert_eq!(zfs.pool_status_queries("backup"), 1);
    }

    #[test]
    fn test_clone_shares_state() {
        let zfs = mock();
        let other = zfs.clone();
        other.create_snapshot("tank/usr@a", false).expect("create");
        assert_eq!(zfs.snapshots_of("tank/usr"), vec!["a"]);
    }
}
