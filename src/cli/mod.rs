//! Command-line interface definitions for the `tarmac` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `tarmac` binary.
#[derive(Debug, Parser)]
#[command(
    name = "tarmac",
    about = "Provision and tear down ephemeral EC2 runners for GitHub Actions",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Provision a runner instance and wait until it is running.
    #[command(
        name = "start",
        about = "Provision a runner instance and wait until it is running"
    )]
    Start(StartCommand),
    /// Terminate the instance named by the configuration.
    #[command(name = "stop", about = "Terminate the instance named by the configuration")]
    Stop,
}

/// Arguments for the `tarmac start` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct StartCommand {
    /// Label the runner registers with; workflows target it via `runs-on`.
    #[arg(long)]
    pub(crate) label: String,
    /// One-time registration token obtained from the orchestration service.
    #[arg(long, env = "TARMAC_REGISTRATION_TOKEN", hide_env_values = true)]
    pub(crate) token: String,
}
