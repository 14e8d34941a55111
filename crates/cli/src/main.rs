use std::process::ExitCode;

use clap::Parser as _;
use cli::Cli;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};
use tracing::{error, info};

use vesper_core::config::Config;

mod cli;
mod telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    telemetry::init();

    let cli = Cli::parse();
    let command_jh = tokio::spawn(cli.run(config));

    // Set up signal handlers for graceful shutdown
    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting sigterm listener on unix should always work");
    let mut sigint = signal(SignalKind::interrupt())
        .expect("setting sigint listener on unix should always work");

    select! {
        res = command_jh => match res {
            Ok(Ok(())) => ExitCode::SUCCESS,
            Ok(Err(e)) => {
                error!(error = %e, "command failed");
                ExitCode::FAILURE
            }
            Err(e) => {
                error!(error = %e, "command task panicked");
                ExitCode::FAILURE
            }
        },
        _ = sigterm.recv() => {
            info!("received SIGTERM signal");
            ExitCode::FAILURE
        }
        _ = sigint.recv() => {
            info!("received SIGINT signal");
            ExitCode::FAILURE
        }
    }
}
