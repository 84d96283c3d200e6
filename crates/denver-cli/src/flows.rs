use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use denver_core::{CancelToken, DenverError, InstanceState};
use denver_provider::{ArtifactUpdater, StopOutcome, VmProvider};
use denver_remote::RemoteShell;
use tracing::info;

use crate::prompt::Confirm;
use crate::render::{render_status_line, OutputStyle, Status};
use crate::term::{TerminalLaunch, TerminalSettings};

pub(crate) const WAIT_INTERVAL: Duration = Duration::from_millis(250);

const RELEASE_UPDATE_QUESTION: &str = "A new version for Denver is available, do you want to update?";
const IMAGE_UPDATE_QUESTION: &str =
    "A new version for the Root Base Image is available, do you want to update?";

/// Everything a command needs once configuration is resolved.
pub(crate) struct Session<'a> {
    pub(crate) provider: &'a dyn VmProvider,
    pub(crate) release: &'a dyn ArtifactUpdater,
    pub(crate) remote: &'a dyn RemoteShell,
    pub(crate) confirm: &'a dyn Confirm,
    pub(crate) cancel: &'a CancelToken,
    pub(crate) style: OutputStyle,
    pub(crate) poll_interval: Duration,
}

impl Session<'_> {
    fn print(&self, out: &mut dyn Write, status: Status, message: &str) -> Result<()> {
        writeln!(out, "{}", render_status_line(self.style, status, message))
            .context("failed to write output")
    }

    /// Self update first, then the base image. Each is offered, never forced.
    pub(crate) fn check_for_updates(&self) -> Result<()> {
        self.check_release_update()?;
        self.check_image_update()?;
        Ok(())
    }

    fn check_release_update(&self) -> Result<bool> {
        if self.release.check_is_updated()? {
            return Ok(true);
        }
        if self.confirm.confirm(RELEASE_UPDATE_QUESTION)? {
            info!("updating denver");
            self.release.update()?;
        }
        Ok(false)
    }

    fn check_image_update(&self) -> Result<bool> {
        if self.provider.check_is_updated()? {
            return Ok(true);
        }
        if self.confirm.confirm(IMAGE_UPDATE_QUESTION)? {
            info!("updating the base image");
            self.provider.update()?;
        }
        Ok(false)
    }

    pub(crate) fn init(&self, out: &mut dyn Write) -> Result<()> {
        self.check_for_updates()?;
        self.provider.init()?;
        self.print(out, Status::Ok, "VM has been installed")
    }

    pub(crate) fn start(&self, out: &mut dyn Write) -> Result<()> {
        self.check_for_updates()?;
        self.provider.start()?;
        self.print(out, Status::Info, "VM is starting...")?;

        if !self.wait_until(|state| state.all_systems_ready) {
            return Ok(());
        }
        self.print(out, Status::Ok, "VM has been started")
    }

    pub(crate) fn stop(&self, out: &mut dyn Write) -> Result<()> {
        if !self.provider.state().live {
            return self.print(out, Status::Skip, "VM already stopped");
        }

        match self.provider.stop()? {
            StopOutcome::AlreadyStopped => {
                return self.print(out, Status::Skip, "VM already stopped");
            }
            StopOutcome::ShutdownRequested => {}
        }
        self.print(out, Status::Info, "VM is stopping...")?;

        if !self.wait_until(|state| !state.live) {
            return Ok(());
        }
        self.print(out, Status::Ok, "VM has been stopped")
    }

    pub(crate) fn status(&self, out: &mut dyn Write) -> Result<()> {
        let state = self.provider.state();
        let lines = [
            (
                state.live,
                "Virtual machine state is power on",
                "Virtual machine state is power off",
            ),
            (
                state.os_ready,
                "Virtual machine OS is ready to handle with SSH",
                "SSH on Virtual machine OS isn't ready",
            ),
            (
                state.all_systems_ready,
                "Virtual machine systems are up",
                "At least one of the Virtual machine systems is down",
            ),
        ];
        for (up, up_message, down_message) in lines {
            if up {
                self.print(out, Status::Ok, up_message)?;
            } else {
                self.print(out, Status::Ko, down_message)?;
            }
        }
        Ok(())
    }

    pub(crate) fn unregister(&self, out: &mut dyn Write) -> Result<()> {
        if self.provider.state().live {
            return Err(DenverError::Conflict("VM is started, stop it first".to_string()).into());
        }
        self.provider.unregister()?;
        self.print(out, Status::Ok, "VM has been unregistered")
    }

    pub(crate) fn check_version(&self, out: &mut dyn Write) -> Result<()> {
        let release_fresh = self.check_release_update()?;
        let image_fresh = self.check_image_update()?;
        if release_fresh && image_fresh {
            self.print(out, Status::Ok, "Your versions are up to date")?;
        }
        Ok(())
    }

    pub(crate) fn ssh(&self) -> Result<()> {
        if !self.provider.state().all_systems_ready {
            return Err(anyhow!("VM not ready"));
        }
        self.remote.terminal()
    }

    pub(crate) fn term(&self, settings: &TerminalSettings, os: &str) -> Result<()> {
        if !self.provider.state().all_systems_ready {
            return Err(anyhow!("VM not ready"));
        }
        TerminalLaunch::resolve(settings, os)?.run()
    }

    /// Polls the published state until `reached` holds. Returns `false` when
    /// cancelled first.
    fn wait_until(&self, reached: impl Fn(&InstanceState) -> bool) -> bool {
        loop {
            if reached(&self.provider.state()) {
                return true;
            }
            if self.cancel.wait_timeout(self.poll_interval) {
                return false;
            }
        }
    }
}
