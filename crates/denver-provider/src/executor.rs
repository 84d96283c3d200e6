use std::process::Command;
use std::sync::Mutex;

use anyhow::Result;
use denver_core::DenverError;
use tracing::debug;

/// The hypervisor's command line tool.
pub trait HypervisorTool: Send + Sync {
    /// Runs the tool with `args` and returns its standard output.
    fn execute(&self, args: &[String]) -> Result<String>;
}

/// VBoxManage is not safe to run concurrently; every invocation in the
/// process goes through this gate.
static TOOL_GATE: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn vboxmanage() -> Self {
        Self::new("VBoxManage")
    }
}

impl HypervisorTool for CommandExecutor {
    fn execute(&self, args: &[String]) -> Result<String> {
        let _gate = TOOL_GATE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(program = %self.program, args = %args.join(" "), "invoking hypervisor tool");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|err| {
                DenverError::Transport(format!("failed to start {}: {err}", self.program))
            })?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Err(DenverError::Transport(format!(
            "{} {} failed: status={} stdout='{}' stderr='{}'",
            self.program,
            args.first().map(String::as_str).unwrap_or_default(),
            output.status,
            stdout.trim(),
            stderr.trim()
        ))
        .into())
    }
}
