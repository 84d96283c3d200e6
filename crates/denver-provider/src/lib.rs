mod describe;
mod executor;
mod probe;
mod virtualbox;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use denver_core::{Action, CancelToken, InstanceState};
use denver_storage::Storage;
use denver_updater::{ImagePolicy, MultiDecompressor, UpdateEngine, WorkingLayout};

pub use describe::{describe, parse_created_interface, parse_vm_names, VmDescription};
pub use executor::{CommandExecutor, HypervisorTool};
pub use probe::{probe_once, ProbeHandle, StateProbe, PROBE_INTERVAL};
pub use virtualbox::{ArtifactUpdater, InstanceSpec, VirtualBox, TYPE_VIRTUALBOX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    ShutdownRequested,
    AlreadyStopped,
}

/// Lifecycle of the single local instance on one hypervisor backend.
pub trait VmProvider: Send + Sync {
    fn init(&self) -> Result<()>;

    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<StopOutcome>;

    fn unregister(&self) -> Result<()>;

    /// Replaces the base image when stale and reprovisions. Returns whether
    /// anything changed.
    fn update(&self) -> Result<bool>;

    fn check_is_updated(&self) -> Result<bool>;

    fn state(&self) -> InstanceState;

    fn add_post_start_action(&mut self, action: Action);

    fn add_pre_stop_action(&mut self, action: Action);

    fn check_if_running(&self) -> Result<bool>;

    /// Publishes a probe result. Post-start actions run on the readiness
    /// edge, on the caller's thread.
    fn set_state(&self, state: InstanceState) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSettings {
    pub name: String,
    pub vcpu: u32,
    pub vmem_mb: u64,
    pub local_ip: String,
    pub user_data_size_gb: u64,
}

/// Where base images are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub rbi_url: String,
    pub channel: String,
}

impl ImageSource {
    fn base_url(&self, hypervisor: &str) -> String {
        format!(
            "{}/{}/{hypervisor}",
            self.rbi_url.trim_end_matches('/'),
            self.channel
        )
    }

    pub fn manifest_url(&self, hypervisor: &str) -> String {
        format!("{}/manifest.json", self.base_url(hypervisor))
    }

    pub fn image_url(&self, hypervisor: &str) -> String {
        format!("{}/box.vdi.bz2", self.base_url(hypervisor))
    }
}

pub fn provider_for(
    hypervisor: &str,
    instance: InstanceSettings,
    image: &ImageSource,
    layout: &WorkingLayout,
    storage: Arc<dyn Storage>,
    cancel: CancelToken,
) -> Result<Box<dyn VmProvider>> {
    match hypervisor {
        TYPE_VIRTUALBOX => {
            let policy = ImagePolicy::new(layout, &image.channel, image.image_url(hypervisor));
            let spec = InstanceSpec {
                name: instance.name,
                vcpu: instance.vcpu,
                vmem_mb: instance.vmem_mb,
                local_ip: instance.local_ip,
                box_path: policy.image_path(),
                user_data_path: layout.user_data_path(),
                user_data_size_mb: instance.user_data_size_gb * 1024,
            };
            let engine = UpdateEngine::new(
                layout.root(),
                image.manifest_url(hypervisor),
                storage,
                Arc::new(MultiDecompressor),
                cancel,
                policy,
            );
            Ok(Box::new(VirtualBox::new(
                spec,
                Arc::new(CommandExecutor::vboxmanage()),
                Arc::new(engine),
            )))
        }
        other => Err(anyhow!("invalid provider {other}")),
    }
}
