use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use denver_core::{
    Action, ActionChain, DenverError, InstanceState, ReadinessTransition, StateCell,
};
use denver_updater::{path_exists, UpdateEngine, UpdatePolicy};
use tracing::{debug, info};

use crate::describe::{describe, parse_created_interface, parse_vm_names};
use crate::executor::HypervisorTool;
use crate::{StopOutcome, VmProvider};

pub const TYPE_VIRTUALBOX: &str = "virtualbox";

const STORAGE_CONTROLLER: &str = "SAS";

#[rustfmt::skip]
const DEFAULT_OPTIONS: &[&str] = &[
    "--acpi", "on",
    "--ioapic", "on",
    "--rtcuseutc", "on",
    "--vram", "2",
    "--accelerate3d", "off",
    "--accelerate2dvideo", "off",
    "--graphicscontroller", "VMSVGA",
    "--biosbootmenu", "disabled",
    "--bioslogofadein", "off",
    "--bioslogofadeout", "off",
    "--bioslogodisplaytime", "0",
    "--firmware", "bios",
    "--boot1", "disk",
    "--boot2", "none",
    "--boot3", "none",
    "--boot4", "none",
    "--mouse", "ps2",
    "--keyboard", "ps2",
    "--usb", "off",
    "--draganddrop", "disabled",
    "--usbcardreader", "off",
    "--audio", "none",
    "--vrde", "off",
    "--tracing-enabled", "off",
    "--nic1", "nat",
    "--nictype1", "virtio",
    "--cableconnected1", "on",
    "--nicpromisc1", "deny",
];

/// What the driver provisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub name: String,
    pub vcpu: u32,
    pub vmem_mb: u64,
    /// Guest address on the private network.
    pub local_ip: String,
    pub box_path: PathBuf,
    pub user_data_path: PathBuf,
    pub user_data_size_mb: u64,
}

impl InstanceSpec {
    /// Host side of the private network: `.1` in the guest's /24.
    pub fn host_ip(&self) -> Result<String> {
        let guest: Ipv4Addr = self.local_ip.trim().parse().map_err(|_| {
            DenverError::Malformed(format!(
                "instance local_ip '{}' is not an IPv4 address",
                self.local_ip
            ))
        })?;
        let [a, b, c, _] = guest.octets();
        Ok(format!("{a}.{b}.{c}.1"))
    }
}

/// Freshness check and replacement of one installed artifact.
pub trait ArtifactUpdater: Send + Sync {
    fn check_is_updated(&self) -> Result<bool>;
    fn update(&self) -> Result<()>;
}

impl<P: UpdatePolicy> ArtifactUpdater for UpdateEngine<P> {
    fn check_is_updated(&self) -> Result<bool> {
        UpdateEngine::check_is_updated(self)
    }

    fn update(&self) -> Result<()> {
        UpdateEngine::update(self)
    }
}

pub struct VirtualBox {
    spec: InstanceSpec,
    tool: Arc<dyn HypervisorTool>,
    updater: Arc<dyn ArtifactUpdater>,
    state: StateCell,
    post_start: ActionChain,
    pre_stop: ActionChain,
}

impl VirtualBox {
    pub fn new(
        spec: InstanceSpec,
        tool: Arc<dyn HypervisorTool>,
        updater: Arc<dyn ArtifactUpdater>,
    ) -> Self {
        Self {
            spec,
            tool,
            updater,
            state: StateCell::new(),
            post_start: ActionChain::new(),
            pre_stop: ActionChain::new(),
        }
    }

    /// Shares an existing state cell instead of a private one.
    pub fn with_state(mut self, state: StateCell) -> Self {
        self.state = state;
        self
    }

    pub fn spec(&self) -> &InstanceSpec {
        &self.spec
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        self.tool.execute(&args)
    }

    fn is_listed(&self, list: &str) -> Result<bool> {
        let output = self.run(&["list", list])?;
        Ok(parse_vm_names(&output)?
            .iter()
            .any(|name| name == &self.spec.name))
    }

    fn exists(&self) -> Result<bool> {
        self.is_listed("vms")
    }

    #[rustfmt::skip]
    fn provision(&self) -> Result<()> {
        let name = self.spec.name.as_str();
        let host_ip = self.spec.host_ip()?;
        info!(instance = name, "provisioning instance");

        self.run(&["createvm", "--name", name, "--ostype", "Ubuntu_64", "--register"])?;

        let mut options = vec!["modifyvm", name];
        options.extend_from_slice(DEFAULT_OPTIONS);
        self.run(&options)?;

        let vcpu = self.spec.vcpu.to_string();
        self.run(&[
            "modifyvm", name,
            "--cpus", vcpu.as_str(),
            "--cpu-profile", "host",
            "--hwvirtex", "on",
            "--paravirtprovider", "kvm",
            "--vtxvpid", "on",
            "--vtxux", "on",
        ])?;

        let vmem = self.spec.vmem_mb.to_string();
        self.run(&[
            "modifyvm", name,
            "--memory", vmem.as_str(),
            "--nestedpaging", "on",
            "--largepages", "on",
            "--pae", "on",
        ])?;

        let created = self.run(&["hostonlyif", "create"])?;
        let interface = parse_created_interface(&created)?;
        debug!(interface = %interface, host_ip = %host_ip, "configuring host-only interface");
        self.run(&[
            "hostonlyif", "ipconfig", interface.as_str(),
            "--ip", host_ip.as_str(),
            "--netmask", "255.255.255.0",
        ])?;
        self.run(&[
            "modifyvm", name,
            "--nic2", "hostonly",
            "--nictype2", "virtio",
            "--cableconnected2", "on",
            "--nicpromisc2", "deny",
            "--hostonlyadapter2", interface.as_str(),
        ])?;

        self.run(&[
            "storagectl", name,
            "--name", STORAGE_CONTROLLER,
            "--add", "sas",
            "--controller", "LSILogicSAS",
            "--portcount", "2",
            "--hostiocache", "on",
            "--bootable", "on",
        ])?;

        let box_path = self.spec.box_path.display().to_string();
        self.attach_medium("0", &box_path)?;

        let user_data = self.spec.user_data_path.display().to_string();
        if !path_exists(&self.spec.user_data_path)? {
            let size = self.spec.user_data_size_mb.to_string();
            self.run(&[
                "createmedium", "disk",
                "--filename", user_data.as_str(),
                "--size", size.as_str(),
                "--format", "VDI",
                "--variant", "Standard",
            ])?;
        }
        self.attach_medium("1", &user_data)?;

        info!(instance = name, "instance provisioned");
        Ok(())
    }

    fn attach_medium(&self, port: &str, medium: &str) -> Result<()> {
        self.run(&[
            "storageattach", self.spec.name.as_str(),
            "--storagectl", STORAGE_CONTROLLER,
            "--port", port,
            "--type", "hdd",
            "--medium", medium,
            "--mtype", "normal",
            "--nonrotational", "on",
            "--discard", "on",
        ])?;
        Ok(())
    }

    fn detach_medium(&self, port: &str, medium: &str) -> Result<()> {
        self.run(&[
            "storageattach", self.spec.name.as_str(),
            "--storagectl", STORAGE_CONTROLLER,
            "--port", port,
            "--medium", "none",
        ])?;
        self.run(&["closemedium", "disk", medium])?;
        Ok(())
    }

    fn conflict(&self, what: &str) -> anyhow::Error {
        DenverError::Conflict(format!("{} {what}", self.spec.name)).into()
    }
}

impl VmProvider for VirtualBox {
    fn init(&self) -> Result<()> {
        if self.exists()? {
            return Err(self.conflict("already exists"));
        }
        if !self.updater.check_is_updated()? {
            self.updater.update()?;
        }
        self.provision()
    }

    fn start(&self) -> Result<()> {
        if !self.exists()? {
            return Err(self.conflict("does not exist"));
        }
        if self.check_if_running()? {
            return Err(self.conflict("is running"));
        }
        self.run(&["startvm", self.spec.name.as_str(), "--type", "gui"])?;
        Ok(())
    }

    fn stop(&self) -> Result<StopOutcome> {
        if !self.exists()? {
            return Err(self.conflict("does not exist"));
        }
        if !self.check_if_running()? {
            return Ok(StopOutcome::AlreadyStopped);
        }
        self.pre_stop.run()?;
        self.run(&["controlvm", self.spec.name.as_str(), "acpipowerbutton"])?;
        Ok(StopOutcome::ShutdownRequested)
    }

    fn unregister(&self) -> Result<()> {
        if self.state().live {
            return Err(self.conflict("is started, stop it first"));
        }
        if !self.exists()? {
            return Err(self.conflict("does not exist"));
        }

        let info = self.run(&["showvminfo", "--machinereadable", self.spec.name.as_str()])?;
        let description = describe(&info)?;
        info!(instance = %self.spec.name, "unregistering instance");

        self.run(&["hostonlyif", "remove", description.host_only_adapter.as_str()])?;
        self.detach_medium("0", &description.root_medium)?;
        self.detach_medium("1", &description.user_data_medium)?;
        self.run(&["unregistervm", self.spec.name.as_str(), "--delete"])?;
        Ok(())
    }

    fn update(&self) -> Result<bool> {
        if self.updater.check_is_updated()? {
            return Ok(false);
        }
        if self.exists()? {
            self.unregister()?;
        }
        self.updater.update()?;
        self.provision()?;
        Ok(true)
    }

    fn check_is_updated(&self) -> Result<bool> {
        self.updater.check_is_updated()
    }

    fn state(&self) -> InstanceState {
        self.state.get()
    }

    fn add_post_start_action(&mut self, action: Action) {
        self.post_start.push(action);
    }

    fn add_pre_stop_action(&mut self, action: Action) {
        self.pre_stop.push(action);
    }

    fn check_if_running(&self) -> Result<bool> {
        self.is_listed("runningvms")
    }

    fn set_state(&self, state: InstanceState) -> Result<()> {
        let previous = self.state.replace(state);
        if ReadinessTransition::between(&previous, &state).runs_post_start_actions() {
            info!(instance = %self.spec.name, "instance ready, running post-start actions");
            self.post_start.run()?;
        }
        Ok(())
    }
}
