//! Command orchestration for CLI subcommands.
//!
//! Provides execute functions for:
//! - `run` - Create due snapshots and prune expired ones
//! - `plan` - Report what `run` would do
//! - `check` - Validate the configuration

pub mod check;
pub mod plan;
pub mod run;

pub use check::execute_check;
pub use plan::{execute_plan, FilesystemPlan, PlanReport};
pub use run::{execute_run, RunReport};

use thiserror::Error;
use zsnap_rules::{ConfigError, PolicyError, PolicySet, PoolStatusError};
use zsnap_zfs::Zfs;

use crate::cli::{CliError, GlobalArgs};
use crate::io::{load_config, ConfigLoadError};
use crate::logger::Logger;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("configuration error: {0}")]
    ConfigLoad(#[from] ConfigLoadError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Policy(#[from] PolicyError),

    #[error("{0}")]
    PoolStatus(#[from] PoolStatusError),

    #[error("{failed} of {total} filesystems failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Load the configuration named by `args` and validate it against `zfs`.
pub fn load_policies<Z: Zfs, L: Logger>(
    args: &GlobalArgs,
    zfs: &Z,
    logger: &L,
) -> CommandResult<PolicySet> {
    args.validate()?;

    logger.debug(&format!("loading configuration from {}", args.config.display()));
    let config = load_config(&args.config, args.config_size_max)?;
    let policies = PolicySet::from_config(&config, zfs)?;
    logger.debug(&format!(
        "{} filesystems on {} pools",
        policies.filesystems().len(),
        policies.pools().len()
    ));
    Ok(policies)
}
