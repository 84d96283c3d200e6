use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use denver_core::DenverError;
use tracing::debug;

use crate::keys::ensure_key_pair;
use crate::protocol::push_file;
use crate::terminal::{RawModeGuard, Viewport};
use crate::RemoteShell;

/// Exit status the `ssh` client reserves for its own failures.
const SSH_CLIENT_FAILURE: i32 = 255;

/// Talks to the guest through the system `ssh` client with key
/// authentication and host key checking off.
#[derive(Debug, Clone)]
pub struct SshClient {
    host: String,
    user: String,
    key_path: PathBuf,
    connect_timeout: Duration,
}

impl SshClient {
    /// Installs the default key pair under `key_dir` when none exists.
    pub fn new(host: impl Into<String>, user: impl Into<String>, key_dir: &Path) -> Result<Self> {
        let key_path = ensure_key_pair(key_dir)?;
        Ok(Self {
            host: host.into(),
            user: user.into(),
            key_path,
            connect_timeout: Duration::from_secs(1),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn base_args(&self, tty: bool) -> Vec<String> {
        let mut args = Vec::new();
        if tty {
            args.push("-tt".to_string());
        }
        args.extend([
            "-i".to_string(),
            self.key_path.display().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            format!("{}@{}", self.user, self.host),
        ]);
        args
    }

    fn command(&self, tty: bool) -> Command {
        let mut command = Command::new("ssh");
        command.args(self.base_args(tty));
        command
    }
}

impl RemoteShell for SshClient {
    fn cmd(&self, command: &str) -> Result<String> {
        debug!(host = %self.host, command, "remote command");
        let output = self
            .command(false)
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| DenverError::Transport(format!("failed to start ssh: {err}")))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(DenverError::Transport(format!(
            "remote command failed: status={} stderr='{}'",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
        .into())
    }

    fn copy(&self, local_file: &Path, remote_path: &str, mode: u32) -> Result<()> {
        let mut file = fs::File::open(local_file)
            .with_context(|| format!("failed to open {}", local_file.display()))?;
        let size = file
            .metadata()
            .with_context(|| format!("failed to stat {}", local_file.display()))?
            .len();

        debug!(host = %self.host, local = %local_file.display(), remote = remote_path, "pushing file");
        let mut child = self
            .command(false)
            .arg(format!("scp -qt {remote_path}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| DenverError::Transport(format!("failed to start ssh: {err}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("ssh stdin was not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("ssh stdout was not captured"))?;

        let result = push_file(&mut stdin, &mut stdout, &mut file, size, mode, remote_path);
        drop(stdin);
        if result.is_err() {
            let _ = child.kill();
        }
        let status = child.wait().context("failed to wait for ssh")?;
        result?;
        if !status.success() {
            debug!(%status, "scp sink exited after acknowledging");
        }
        Ok(())
    }

    fn terminal(&self) -> Result<()> {
        let viewport = Viewport::detect();
        let _raw_mode = if io::stdin().is_terminal() {
            Some(RawModeGuard::new()?)
        } else {
            None
        };

        let status = self
            .command(true)
            .arg(format!(
                "stty cols {} rows {} 2>/dev/null; exec \"$SHELL\" -l",
                viewport.cols, viewport.rows
            ))
            .status()
            .map_err(|err| DenverError::Transport(format!("failed to start ssh: {err}")))?;

        if status.code() == Some(SSH_CLIENT_FAILURE) {
            return Err(
                DenverError::Transport(format!("ssh session to {} failed", self.host)).into(),
            );
        }
        Ok(())
    }
}
