//! CLI argument parsing for zsnap.
//!
//! `zsnap` with no command performs one snapshot run; `plan` and `check`
//! inspect the configuration without touching any filesystem.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::logger::Verbosity;

/// Default location of the rule configuration.
pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/zfs-snapshot-mgmt.conf";

/// Default cap on the configuration file size in bytes.
pub const DEFAULT_CONFIG_SIZE_MAX: u64 = 64 * 1024;

/// Default `zfs` executable.
pub const DEFAULT_ZFS_BIN: &str = "zfs";

/// Default `zpool` executable.
pub const DEFAULT_ZPOOL_BIN: &str = "zpool";

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("config-size-max must be at least 1, got {0}")]
    InvalidConfigSizeMax(u64),
}

/// Periodic ZFS snapshot creation and pruning.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "zsnap")]
#[command(version = VERSION, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The command to execute; a bare `zsnap` is `zsnap run`.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Rule configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Reject configuration files larger than this many bytes.
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIG_SIZE_MAX)]
    pub config_size_max: u64,

    /// `zfs` executable.
    #[arg(long, global = true, default_value = DEFAULT_ZFS_BIN)]
    pub zfs_bin: PathBuf,

    /// `zpool` executable.
    #[arg(long, global = true, default_value = DEFAULT_ZPOOL_BIN)]
    pub zpool_bin: PathBuf,

    /// Increase log output (-v verbose, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors and warnings.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.config_size_max == 0 {
            return Err(CliError::InvalidConfigSizeMax(self.config_size_max));
        }
        Ok(())
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create due snapshots and destroy expired ones (default).
    Run(RunArgs),
    /// Show what a run would do without changing anything.
    Plan(PlanArgs),
    /// Validate the configuration and list the managed filesystems.
    Check,
}

/// Arguments for the run command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Stop at the first filesystem that fails.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Arguments for the plan command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PlanArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
