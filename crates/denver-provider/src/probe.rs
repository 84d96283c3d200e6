use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use denver_core::{CancelToken, InstanceState};
use denver_remote::RemoteShell;
use tracing::{debug, warn};

use crate::VmProvider;

pub const PROBE_INTERVAL: Duration = Duration::from_millis(250);

const READINESS_COMMAND: &str = "echo 'OK'";
const READINESS_REPLY: &str = "OK";

/// Polls the instance and publishes what it sees through the provider's
/// state setter.
pub struct StateProbe {
    remote: Arc<dyn RemoteShell>,
    cancel: CancelToken,
    interval: Duration,
}

/// Background loop started by [`StateProbe::start`]. Stops on process
/// cancellation, on [`ProbeHandle::stop`], or when dropped.
pub struct ProbeHandle {
    stop: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl StateProbe {
    pub fn new(remote: Arc<dyn RemoteShell>, cancel: CancelToken) -> Self {
        Self {
            remote,
            cancel,
            interval: PROBE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Probes once synchronously and returns that cycle's liveness error, if
    /// any. Later cycles run in the background and only log.
    pub fn start(self, provider: Arc<dyn VmProvider>) -> Result<ProbeHandle> {
        probe_once(provider.as_ref(), self.remote.as_ref())?;

        let stop = CancelToken::new();
        let thread = {
            let stop = stop.clone();
            thread::spawn(move || {
                while !self.cancel.wait_timeout(self.interval) && !stop.is_cancelled() {
                    if let Err(err) = probe_once(provider.as_ref(), self.remote.as_ref()) {
                        warn!(error = %format!("{err:#}"), "probe cycle failed");
                    }
                }
                debug!("probe stopped");
            })
        };

        Ok(ProbeHandle {
            stop,
            thread: Some(thread),
        })
    }
}

impl ProbeHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One probe cycle. The observed state is always published; only a failed
/// liveness check is returned.
pub fn probe_once(provider: &dyn VmProvider, remote: &dyn RemoteShell) -> Result<()> {
    let mut state = InstanceState::powered_off();
    let observed = observe(provider, remote, &mut state);
    if let Err(err) = provider.set_state(state) {
        warn!(error = %format!("{err:#}"), "failed to publish instance state");
    }
    observed
}

fn observe(
    provider: &dyn VmProvider,
    remote: &dyn RemoteShell,
    state: &mut InstanceState,
) -> Result<()> {
    state.live = provider.check_if_running()?;
    if !state.live {
        return Ok(());
    }

    match remote.cmd(READINESS_COMMAND) {
        Ok(output) => {
            state.os_ready = true;
            state.all_systems_ready = output.trim() == READINESS_REPLY;
        }
        Err(err) => {
            debug!(error = %format!("{err:#}"), "instance not reachable yet");
        }
    }
    Ok(())
}
