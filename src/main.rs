//! Binary entry point for the Tarmac CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tarmac::{Ec2Provider, Ec2ProviderError, LifecycleError, RunnerConfig, RunnerLifecycle};

mod cli;

use cli::{Cli, StartCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Lifecycle(#[from] Box<LifecycleError<Ec2ProviderError>>),
}

impl From<LifecycleError<Ec2ProviderError>> for CliError {
    fn from(value: LifecycleError<Ec2ProviderError>) -> Self {
        Self::Lifecycle(Box::new(value))
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tarmac=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Start(command) => start(command).await,
        Cli::Stop => stop().await,
    }
}

async fn start(args: StartCommand) -> Result<(), CliError> {
    let lifecycle = lifecycle_from_config().await?;
    let instance_id = lifecycle.provision(&args.label, &args.token).await?;
    lifecycle.await_ready(&instance_id).await?;
    writeln!(io::stdout(), "{instance_id}").ok();
    Ok(())
}

async fn stop() -> Result<(), CliError> {
    let lifecycle = lifecycle_from_config().await?;
    lifecycle.terminate().await?;
    Ok(())
}

async fn lifecycle_from_config() -> Result<RunnerLifecycle<Ec2Provider>, CliError> {
    let config =
        RunnerConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let provider = Ec2Provider::from_env(config.region.clone()).await;
    Ok(RunnerLifecycle::new(provider, config))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
