mod config;
mod dispatch;
mod flows;
mod logging;
mod prompt;
mod render;
mod signals;
mod term;
mod user;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use denver_core::CancelToken;

use crate::render::{current_output_style, render_status_line, Status};

#[derive(Parser, Debug)]
#[command(name = "denver")]
#[command(about = "Helper minion for the D3nver platform", long_about = None)]
#[command(version)]
struct Cli {
    /// Explicit path to config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Download the base image if needed and register the VM.
    Init,
    /// Start the VM and wait until every system is up.
    Start,
    /// Request an ACPI shutdown and wait until the VM is off.
    Stop,
    /// Show power, SSH and systems state.
    Status,
    /// Remove the VM and its network from the hypervisor.
    Unregister,
    /// Check whether denver and the base image are up to date.
    CheckVersion,
    /// Open an interactive shell on the VM.
    Ssh,
    /// Open the configured terminal connected to the VM.
    Term,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    signals::spawn_signal_watcher(cancel.clone());

    match dispatch::run_cli(cli, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!(
                "{}",
                render_status_line(current_output_style(), Status::Ko, &format!("{err:#}"))
            );
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
