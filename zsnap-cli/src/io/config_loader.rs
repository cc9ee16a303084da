//! Configuration file loader.
//!
//! Reads a YAML rule file with a hard size cap and deserializes it into a
//! `PolicyConfig`. Validation against the live system happens later, in
//! `PolicySet::from_config`.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zsnap_rules::PolicyConfig;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is larger than {max_bytes} bytes")]
    TooLarge { path: PathBuf, max_bytes: u64 },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load a configuration from `path`, rejecting files over `max_bytes`.
pub fn load_config(path: &Path, max_bytes: u64) -> Result<PolicyConfig, ConfigLoadError> {
    let read_error = |source| ConfigLoadError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut content = String::new();
    // One byte past the cap is enough to tell an oversized file apart
    file.take(max_bytes.saturating_add(1))
        .read_to_string(&mut content)
        .map_err(read_error)?;

    if content.len() as u64 > max_bytes {
        return Err(ConfigLoadError::TooLarge {
            path: path.to_path_buf(),
            max_bytes,
        });
    }

    parse_config(&content).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse configuration content from a string.
pub fn parse_config(content: &str) -> Result<PolicyConfig, serde_yaml::Error> {
    serde_yaml::from_str(content)
}
