//! Run command orchestration.
//!
//! One pass over every managed filesystem: skip busy pools, create the due
//! snapshot, then destroy what no preservation rule keeps.

use zsnap_clock::Clock;
use zsnap_rules::{FilesystemPolicy, PolicyError, PolicySet};
use zsnap_zfs::Zfs;

use crate::cli::RunArgs;
use crate::logger::Logger;

use super::{CommandError, CommandResult};

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Handles of snapshots created.
    pub created: Vec<String>,
    /// Handles of snapshots destroyed.
    pub destroyed: Vec<String>,
    /// Filesystems skipped because their pool was busy.
    pub skipped: Vec<String>,
    /// Filesystems that failed.
    pub failed: Vec<String>,
    /// Number of filesystems considered.
    pub total: usize,
}

impl RunReport {
    /// One-line summary for the operator.
    pub fn summary(&self) -> String {
        format!(
            "created {}, destroyed {}, skipped {}, failed {}",
            self.created.len(),
            self.destroyed.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }

    /// `PartialFailure` if any filesystem failed.
    pub fn outcome(&self) -> CommandResult<()> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(CommandError::PartialFailure {
                failed: self.failed.len(),
                total: self.total,
            })
        }
    }
}

/// Execute the run command.
///
/// The current minute is read once, so every filesystem is evaluated
/// against the same instant. A filesystem that fails is logged and
/// recorded, and the remaining filesystems are still processed unless
/// `fail_fast` is set. A pool status failure always aborts.
pub fn execute_run<Z, C, L>(
    args: &RunArgs,
    policies: &PolicySet,
    zfs: &Z,
    clock: &C,
    logger: &L,
) -> CommandResult<RunReport>
where
    Z: Zfs,
    C: Clock,
    L: Logger,
{
    let now = clock.now_unix_min();
    logger.debug(&format!("evaluating at minute {}", now));

    let mut report = RunReport {
        total: policies.filesystems().len(),
        ..RunReport::default()
    };

    for policy in policies.filesystems() {
        let name = &policy.filesystem_name;
        if policies.is_busy(policy, zfs)? {
            logger.info(&format!(
                "skipping {}: pool {} is busy",
                name,
                policies.pool_of(policy)
            ));
            report.skipped.push(name.clone());
            continue;
        }

        let prefix = policies.snapshot_prefix();
        if let Err(e) = run_filesystem(policy, prefix, now, zfs, clock, logger, &mut report) {
            logger.error(&e.to_string());
            if args.fail_fast {
                return Err(e.into());
            }
            report.failed.push(name.clone());
        }
    }

    Ok(report)
}

fn run_filesystem<Z: Zfs, C: Clock, L: Logger>(
    policy: &FilesystemPolicy,
    prefix: &str,
    now: i64,
    zfs: &Z,
    clock: &C,
    logger: &L,
    report: &mut RunReport,
) -> Result<(), PolicyError> {
    match policy.create_snapshot(now, prefix, zfs, clock)? {
        Some(snapshot) => {
            logger.info(&format!("created {}", snapshot));
            report.created.push(snapshot.to_string());
        }
        None => logger.verbose(&format!("{}: no snapshot due", policy.filesystem_name)),
    }

    for snapshot in policy.remove_snapshots(now, prefix, zfs, clock)? {
        logger.info(&format!("destroyed {}", snapshot));
        report.destroyed.push(snapshot.to_string());
    }
    Ok(())
}
