//! Check command: describe the validated configuration.

use zsnap_rules::{CadenceRule, FilesystemPolicy, PolicySet};

fn describe_cadence(rule: &CadenceRule) -> String {
    if rule.interval_minutes == 0 {
        "every minute".to_string()
    } else {
        format!("every {} min +{}", rule.interval_minutes, rule.offset_minutes)
    }
}

fn describe(policies: &PolicySet, policy: &FilesystemPolicy) -> String {
    format!(
        "{}: pool {}, mounted at {}, create {}, {} preservation rule(s){}",
        policy.filesystem_name,
        policies.pool_of(policy),
        policy.mount_point.display(),
        describe_cadence(&policy.creation_rule),
        policy.preservation_rules.len(),
        if policy.recursive { ", recursive" } else { "" }
    )
}

/// Execute the check command. Loading the `PolicySet` already validated
/// everything; this only renders one line per filesystem.
pub fn execute_check(policies: &PolicySet) -> Vec<String> {
    policies
        .filesystems()
        .iter()
        .map(|policy| describe(policies, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zsnap_rules::{PoolCharset, PreservationRule};

    #[test]
    fn test_check_lines() {
        let policies = PolicySet::new(
            "auto-",
            PoolCharset::default(),
            vec![
                FilesystemPolicy::new("tank/usr", "/usr")
                    .with_creation_rule(CadenceRule::new(15, 5))
                    .with_preservation_rule(PreservationRule::default())
                    .with_preservation_rule(PreservationRule::default())
                    .with_recursive(true),
                FilesystemPolicy::new("backup", "/backup")
                    .with_creation_rule(CadenceRule::always()),
            ],
        )
        .expect("set");

        assert_eq!(
            execute_check(&policies),
            vec![
                "tank/usr: pool tank, mounted at /usr, create every 15 min +5, 2 preservation rule(s), recursive",
                "backup: pool backup, mounted at /backup, create every minute, 0 preservation rule(s)",
            ]
        );
    }
}
