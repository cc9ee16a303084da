//! zsnap CLI binary.
//!
//! Entry point for the `zsnap` command-line tool, meant to be run once a
//! minute from cron.

use std::process::ExitCode;

use clap::Parser;
use zsnap_cli::exit::{codes, exit_code};
use zsnap_cli::{
    execute_check, execute_plan, execute_run, load_policies, Cli, Command, CommandError,
    GlobalArgs, Logger, PlanArgs, RunArgs, StderrLogger,
};
use zsnap_clock::SystemClock;
use zsnap_zfs::RealZfs;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                codes::INVALID_ARGS
            } else {
                codes::SUCCESS
            };
            return ExitCode::from(code as u8);
        }
    };

    let logger = StderrLogger::new(cli.global.verbosity());
    let zfs = RealZfs::new(&cli.global.zfs_bin, &cli.global.zpool_bin);

    let result = match cli.command() {
        Command::Run(args) => run_run(&cli.global, &args, &zfs, &logger),
        Command::Plan(args) => run_plan(&cli.global, &args, &zfs, &logger),
        Command::Check => run_check(&cli.global, &zfs, &logger),
    };

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            logger.error(&e.to_string());
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Run the run command.
fn run_run(
    global: &GlobalArgs,
    args: &RunArgs,
    zfs: &RealZfs,
    logger: &StderrLogger,
) -> Result<(), CommandError> {
    let policies = load_policies(global, zfs, logger)?;
    let report = execute_run(args, &policies, zfs, &SystemClock, logger)?;
    logger.info(&report.summary());
    report.outcome()
}

/// Run the plan command.
fn run_plan(
    global: &GlobalArgs,
    args: &PlanArgs,
    zfs: &RealZfs,
    logger: &StderrLogger,
) -> Result<(), CommandError> {
    let policies = load_policies(global, zfs, logger)?;
    let report = execute_plan(&policies, zfs, &SystemClock, logger)?;
    print!("{}", report.render(args.format)?);
    report.outcome()
}

/// Run the check command.
fn run_check(global: &GlobalArgs, zfs: &RealZfs, logger: &StderrLogger) -> Result<(), CommandError> {
    let policies = load_policies(global, zfs, logger)?;
    for line in execute_check(&policies) {
        println!("{}", line);
    }
    Ok(())
}
