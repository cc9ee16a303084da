//! Plan command: evaluate every policy without creating or destroying
//! anything.

use serde::Serialize;
use zsnap_clock::Clock;
use zsnap_rules::{FilesystemPolicy, PolicyError, PolicySet};
use zsnap_zfs::Zfs;

use crate::cli::OutputFormat;
use crate::logger::Logger;

use super::{CommandError, CommandResult};

/// Planned actions for one filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesystemPlan {
    pub filesystem: String,
    pub pool: String,
    pub busy: bool,
    /// Handle of the snapshot a run would create.
    pub create: Option<String>,
    /// Handles of the snapshots a run would destroy, oldest first.
    pub destroy: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Planned actions for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub now_minutes: i64,
    pub filesystems: Vec<FilesystemPlan>,
}

impl PlanReport {
    /// `PartialFailure` if any filesystem could not be evaluated.
    pub fn outcome(&self) -> CommandResult<()> {
        let failed = self.filesystems.iter().filter(|fs| fs.error.is_some()).count();
        if failed == 0 {
            Ok(())
        } else {
            Err(CommandError::PartialFailure {
                failed,
                total: self.filesystems.len(),
            })
        }
    }

    pub fn render(&self, format: OutputFormat) -> CommandResult<String> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        for fs in &self.filesystems {
            out.push_str(&format!("{} (pool {})\n", fs.filesystem, fs.pool));
            if fs.busy {
                out.push_str("  skip     pool busy\n");
                continue;
            }
            if let Some(error) = &fs.error {
                out.push_str(&format!("  error    {}\n", error));
            }
            if let Some(handle) = &fs.create {
                out.push_str(&format!("  create   {}\n", handle));
            }
            for handle in &fs.destroy {
                out.push_str(&format!("  destroy  {}\n", handle));
            }
            if fs.error.is_none() && fs.create.is_none() && fs.destroy.is_empty() {
                out.push_str("  nothing to do\n");
            }
        }
        out
    }
}

/// Execute the plan command.
///
/// Busy state is still queried, since it decides what a run would touch.
/// Evaluation errors are recorded per filesystem instead of aborting.
pub fn execute_plan<Z, C, L>(
    policies: &PolicySet,
    zfs: &Z,
    clock: &C,
    logger: &L,
) -> CommandResult<PlanReport>
where
    Z: Zfs,
    C: Clock,
    L: Logger,
{
    let now = clock.now_unix_min();
    let mut filesystems = Vec::with_capacity(policies.filesystems().len());

    for policy in policies.filesystems() {
        let mut plan = FilesystemPlan {
            filesystem: policy.filesystem_name.clone(),
            pool: policies.pool_of(policy).to_string(),
            busy: policies.is_busy(policy, zfs)?,
            create: None,
            destroy: Vec::new(),
            error: None,
        };
        if !plan.busy {
            let prefix = policies.snapshot_prefix();
            if let Err(e) = plan_filesystem(policy, prefix, now, zfs, clock, &mut plan) {
                logger.warn(&e.to_string());
                plan.error = Some(e.to_string());
            }
        }
        filesystems.push(plan);
    }

    Ok(PlanReport {
        now_minutes: now,
        filesystems,
    })
}

fn plan_filesystem<Z: Zfs, C: Clock>(
    policy: &FilesystemPolicy,
    prefix: &str,
    now: i64,
    zfs: &Z,
    clock: &C,
    plan: &mut FilesystemPlan,
) -> Result<(), PolicyError> {
    plan.create = policy
        .planned_snapshot(now, prefix, clock)?
        .map(|snapshot| snapshot.to_string());
    plan.destroy = policy
        .snapshots_to_remove(now, prefix, zfs, clock)?
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NullLogger;
    use zsnap_clock::MockClock;
    use zsnap_rules::{CadenceRule, PoolCharset, PreservationRule};
    use zsnap_zfs::{MockZfs, ZfsCall};

    // 2009-08-05 21:00 UTC
    const NOW: i64 = 20825100;

    fn clock() -> MockClock {
        MockClock::at_minute(NOW as u64)
    }

    fn setup(names: &[&str]) -> (MockZfs, PolicySet) {
        let zfs = MockZfs::new();
        let mut policies = Vec::new();
        for name in names {
            zfs.add_filesystem(name, format!("/mnt/{name}"));
            policies.push(
                FilesystemPolicy::new(*name, format!("/mnt/{name}"))
                    .with_preservation_rule(PreservationRule::new(CadenceRule::new(60, 0), 120)),
            );
        }
        let set = PolicySet::new("auto-", PoolCharset::default(), policies).expect("set");
        (zfs, set)
    }

    #[test]
    fn test_plan_lists_actions_without_mutating() {
        let (zfs, set) = setup(&["tank/usr"]);
        zfs.add_snapshot("tank/usr", "auto-2009-08-05_18.00");
        zfs.add_snapshot("tank/usr", "auto-2009-08-05_20.00");

        let report = execute_plan(&set, &zfs, &clock(), &NullLogger).expect("plan");

        assert_eq!(report.now_minutes, NOW);
        let fs = &report.filesystems[0];
        assert_eq!(fs.pool, "tank");
        assert!(!fs.busy);
        assert_eq!(fs.create.as_deref(), Some("tank/usr@auto-2009-08-05_21.00"));
        assert_eq!(fs.destroy, vec!["tank/usr@auto-2009-08-05_18.00"]);
        assert!(zfs
            .calls()
            .iter()
            .all(|c| !matches!(c, ZfsCall::Create { .. } | ZfsCall::Destroy { .. })));
        assert!(report.outcome().is_ok());
    }

    #[test]
    fn test_plan_busy_pool() {
        let (zfs, set) = setup(&["tank/usr"]);
        zfs.set_pool_busy("tank", true);

        let report = execute_plan(&set, &zfs, &clock(), &NullLogger).expect("plan");

        let fs = &report.filesystems[0];
        assert!(fs.busy);
        assert_eq!(fs.create, None);
        assert!(report.render(OutputFormat::Text).expect("render").contains("pool busy"));
    }

    #[test]
    fn test_plan_records_errors_and_continues() {
        let (zfs, set) = setup(&["backup/data", "tank/usr"]);
        zfs.add_snapshot("backup/data", "auto-garbage");

        let report = execute_plan(&set, &zfs, &clock(), &NullLogger).expect("plan");

        assert!(report.filesystems[0].error.as_deref().unwrap_or("").contains("auto-garbage"));
        assert!(report.filesystems[1].error.is_none());
        assert!(matches!(
            report.outcome(),
            Err(CommandError::PartialFailure { failed: 1, total: 2 })
        ));
    }

    #[test]
    fn test_render_text() {
        let (zfs, set) = setup(&["tank/usr"]);
        let clock = MockClock::at_minute(NOW as u64 + 1);

        let text = execute_plan(&set, &zfs, &clock, &NullLogger)
            .expect("plan")
            .render(OutputFormat::Text)
            .expect("render");

        assert_eq!(text, "tank/usr (pool tank)\n  nothing to do\n");
    }

    #[test]
    fn test_render_json() {
        let (zfs, set) = setup(&["tank/usr"]);

        let json = execute_plan(&set, &zfs, &clock(), &NullLogger)
            .expect("plan")
            .render(OutputFormat::Json)
            .expect("render");

        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["now_minutes"], NOW);
        assert_eq!(value["filesystems"][0]["filesystem"], "tank/usr");
        assert_eq!(
            value["filesystems"][0]["create"],
            "tank/usr@auto-2009-08-05_21.00"
        );
        assert!(value["filesystems"][0].get("error").is_none());
    }
}
