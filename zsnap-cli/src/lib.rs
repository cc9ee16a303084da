//! zsnap CLI.
//!
//! This crate provides the command-line interface for zsnap: argument
//! parsing, configuration loading, logging, and the `run`, `plan` and
//! `check` commands.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod io;
pub mod logger;

pub use cli::{
    parse_from, Cli, CliError, Command, GlobalArgs, OutputFormat, PlanArgs, RunArgs,
    DEFAULT_CONFIG_PATH, DEFAULT_CONFIG_SIZE_MAX,
};
pub use commands::{
    execute_check, execute_plan, execute_run, load_policies, CommandError, CommandResult,
    PlanReport, RunReport,
};
pub use logger::{Logger, MockLogger, NullLogger, StderrLogger, Verbosity};
