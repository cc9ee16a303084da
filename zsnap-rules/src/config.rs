//! Deserializable rule configuration.
//!
//! Field names match the configuration file format:
//!
//! ```yaml
//! snapshot_prefix: auto-
//! filesystems:
//!   tank/usr:
//!     recursive: true
//!     creation_rule: { at_multiple: 60, offset: 0 }
//!     preservation_rules:
//!       - { for_minutes: 240, at_multiple: 0, offset: 0 }
//!       - { for_minutes: 10080, at_multiple: 1440, offset: 0 }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zsnap_zfs::ZfsError;

use crate::cadence::{CadenceRule, DEFAULT_INTERVAL_MINUTES, DEFAULT_OFFSET_MINUTES};
use crate::preservation::{PreservationRule, DEFAULT_RETENTION_MINUTES};

/// Errors found while validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("snapshot_prefix must not be empty")]
    EmptyPrefix,

    #[error("filesystem {0} has no creation rule")]
    MissingCreationRule(String),

    #[error("filesystem {0} has no preservation rules")]
    MissingPreservationRules(String),

    #[error("filesystem {0} does not start with a pool name")]
    NoPoolId(String),

    #[error("filesystem {filesystem} has pool name {pool:?}, which zpool would read as an option")]
    InvalidPoolId { filesystem: String, pool: String },

    #[error("filesystem {0} is not mounted")]
    NotMounted(String),

    #[error("failed to resolve mount point of {filesystem}: {source}")]
    MountLookup {
        filesystem: String,
        #[source]
        source: ZfsError,
    },
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Prefix of every managed snapshot name.
    pub snapshot_prefix: String,

    /// Characters allowed in pool ids in addition to `[A-Za-z_:.-]`.
    #[serde(default)]
    pub pool_name_chars: String,

    /// Filesystems in the order they appear in the document.
    #[serde(with = "document_order")]
    pub filesystems: Vec<(String, FilesystemConfig)>,
}

impl PolicyConfig {
    /// Rules configured for `name`.
    pub fn filesystem(&self, name: &str) -> Option<&FilesystemConfig> {
        self.filesystems
            .iter()
            .find(|(fs, _)| fs == name)
            .map(|(_, config)| config)
    }
}

/// A YAML mapping read into a list so the operator's ordering survives.
mod document_order {
    use std::fmt;

    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::FilesystemConfig;

    pub fn serialize<S>(
        entries: &[(String, FilesystemConfig)],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (name, config) in entries {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, FilesystemConfig)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor)
    }

    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, FilesystemConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of filesystem names to rules")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries: Vec<(String, FilesystemConfig)> =
                Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, config)) = access.next_entry::<String, FilesystemConfig>()? {
                if entries.iter().any(|(seen, _)| *seen == name) {
                    return Err(de::Error::custom(format!("duplicate filesystem {name}")));
                }
                entries.push((name, config));
            }
            Ok(entries)
        }
    }
}

/// Rules for one filesystem. Both rule fields are optional here so a
/// missing one is reported by name instead of as a YAML error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemConfig {
    #[serde(default)]
    pub creation_rule: Option<CadenceConfig>,

    #[serde(default)]
    pub preservation_rules: Option<Vec<PreservationConfig>>,

    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    #[serde(default = "default_interval")]
    pub at_multiple: u32,

    #[serde(default = "default_offset")]
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreservationConfig {
    #[serde(default = "default_retention")]
    pub for_minutes: u64,

    #[serde(default = "default_interval")]
    pub at_multiple: u32,

    #[serde(default = "default_offset")]
    pub offset: i64,
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_offset() -> i64 {
    DEFAULT_OFFSET_MINUTES
}

fn default_retention() -> u64 {
    DEFAULT_RETENTION_MINUTES
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            at_multiple: default_interval(),
            offset: default_offset(),
        }
    }
}

impl Default for PreservationConfig {
    fn default() -> Self {
        Self {
            for_minutes: default_retention(),
            at_multiple: default_interval(),
            offset: default_offset(),
        }
    }
}

impl From<CadenceConfig> for CadenceRule {
    fn from(config: CadenceConfig) -> Self {
        CadenceRule::new(config.at_multiple, config.offset)
    }
}

impl From<PreservationConfig> for PreservationRule {
    fn from(config: PreservationConfig) -> Self {
        PreservationRule::new(
            CadenceRule::new(config.at_multiple, config.offset),
            config.for_minutes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<PolicyConfig, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[test]
    fn test_full_document() {
        let config = parse(
            r#"
snapshot_prefix: auto-
pool_name_chars: "0123456789"
filesystems:
  tank/usr:
    recursive: true
    creation_rule:
      at_multiple: 15
      offset: 5
    preservation_rules:
      - { for_minutes: 240, at_multiple: 0, offset: 0 }
      - { for_minutes: 10080, at_multiple: 1440, offset: 0 }
"#,
        )
        .expect("parse");

        assert_eq!(config.snapshot_prefix, "auto-");
        assert_eq!(config.pool_name_chars, "0123456789");
        let fs = config.filesystem("tank/usr").expect("tank/usr");
        assert!(fs.recursive);
        assert_eq!(
            fs.creation_rule,
            Some(CadenceConfig {
                at_multiple: 15,
                offset: 5
            })
        );
        let rules = fs.preservation_rules.as_ref().expect("rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(
            PreservationRule::from(rules[1]),
            PreservationRule::new(CadenceRule::new(1440, 0), 10080)
        );
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
snapshot_prefix: auto-
filesystems:
  tank:
    creation_rule: {}
    preservation_rules:
      - {}
"#,
        )
        .expect("parse");

        assert_eq!(config.pool_name_chars, "");
        let fs = config.filesystem("tank").expect("tank");
        assert!(!fs.recursive);
        assert_eq!(fs.creation_rule, Some(CadenceConfig::default()));
        assert_eq!(
            CadenceRule::from(CadenceConfig::default()),
            CadenceRule::default()
        );
        assert_eq!(
            PreservationRule::from(fs.preservation_rules.as_ref().expect("rules")[0]),
            PreservationRule::default()
        );
    }

    #[test]
    fn test_missing_rules_parse_as_none() {
        let config = parse("snapshot_prefix: a-\nfilesystems:\n  tank: {}\n").expect("parse");
        assert_eq!(config.filesystem("tank"), Some(&FilesystemConfig::default()));
        assert_eq!(config.filesystem("backup"), None);
    }

    #[test]
    fn test_filesystems_keep_document_order() {
        let config = parse(
            "snapshot_prefix: a-\nfilesystems:\n  tank/var: {}\n  backup: {}\n  tank/home: {}\n",
        )
        .expect("parse");
        let names: Vec<&str> = config.filesystems.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["tank/var", "backup", "tank/home"]);
    }

    #[test]
    fn test_duplicate_filesystem_rejected() {
        let err = parse("snapshot_prefix: a-\nfilesystems:\n  tank: {}\n  tank: {}\n")
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn test_serialize_keeps_document_order() {
        let config = parse("snapshot_prefix: a-\nfilesystems:\n  zz: {}\n  aa: {}\n")
            .expect("parse");
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        let zz = yaml.find("zz:").expect("zz");
        let aa = yaml.find("aa:").expect("aa");
        assert!(zz < aa, "{yaml}");
        assert_eq!(parse(&yaml).expect("reparse"), config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = parse(
            "snapshot_prefix: a-\nfilesystems:\n  tank:\n    creation_rule: { at_multple: 60 }\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_interval_rejected() {
        let result = parse(
            "snapshot_prefix: a-\nfilesystems:\n  tank:\n    creation_rule: { at_multiple: -60 }\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert!(parse("filesystems: {}\n").is_err());
    }

    #[test]
    fn test_missing_filesystems_rejected() {
        assert!(parse("snapshot_prefix: a-\n").is_err());
    }
}
