use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use denver_core::DenverError;
use tracing::debug;

pub(crate) const DEFAULT_TERMINAL: &str = "default";
const ITERM2_TERMINAL: &str = "iterm2";

/// Where and how the external terminal reaches the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TerminalSettings {
    /// `default`, `iterm2` or a program to run as is.
    pub(crate) terminal: String,
    pub(crate) terminal_arguments: String,
    pub(crate) working_dir: PathBuf,
    pub(crate) ssh_key: PathBuf,
    pub(crate) ssh_user: String,
    pub(crate) host: String,
}

/// Fully resolved terminal invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TerminalLaunch {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) working_dir: PathBuf,
}

impl TerminalLaunch {
    pub(crate) fn resolve(settings: &TerminalSettings, os: &str) -> Result<Self> {
        let tools = settings.working_dir.join("tools");
        let mut args = Vec::new();

        let program = match settings.terminal.as_str() {
            DEFAULT_TERMINAL => {
                args.extend([
                    "--config-file".to_string(),
                    tools.join("alacritty.yml").display().to_string(),
                    "--working-directory".to_string(),
                    settings.working_dir.display().to_string(),
                    "-e".to_string(),
                ]);
                tools.join(bundled_terminal(os)?)
            }
            ITERM2_TERMINAL => match os {
                "macos" | "darwin" => tools.join("iterm2.sh"),
                _ => return Err(anyhow!("not supported on this system")),
            },
            other => PathBuf::from(other),
        };

        args.extend(
            settings
                .terminal_arguments
                .split_whitespace()
                .map(str::to_string),
        );
        args.extend([
            "ssh".to_string(),
            "-i".to_string(),
            settings.ssh_key.display().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            format!("{}@{}", settings.ssh_user, settings.host),
        ]);

        Ok(Self {
            program,
            args,
            working_dir: settings.working_dir.clone(),
        })
    }

    /// Runs the terminal until it exits.
    pub(crate) fn run(&self) -> Result<()> {
        debug!(program = %self.program.display(), args = ?self.args, "launching terminal");
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.working_dir);
        run_command(
            &mut command,
            &format!("failed to run terminal {}", self.program.display()),
        )
    }
}

fn bundled_terminal(os: &str) -> Result<&'static str> {
    match os {
        "windows" => Ok("alacritty-windows-0.4.1.exe"),
        "macos" | "darwin" => Ok("alacritty-darwin-0.4.1"),
        "linux" => Ok("alacritty-linux-0.4.1"),
        other => Err(anyhow!("no bundled terminal for {other}")),
    }
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: failed to spawn"))?;
    if output.status.success() {
        return Ok(());
    }

    Err(DenverError::Transport(format!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        String::from_utf8_lossy(&output.stdout).trim(),
        String::from_utf8_lossy(&output.stderr).trim()
    ))
    .into())
}
