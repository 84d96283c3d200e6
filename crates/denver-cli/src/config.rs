use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use denver_core::DenverError;
use denver_provider::{ImageSource, InstanceSettings};
use serde::Deserialize;

use crate::term::DEFAULT_TERMINAL;

pub(crate) const CONFIG_FILE_NAME: &str = "config.toml";
const WORKING_DIR_ENV: &str = "DENVER_WORKING_DIR";
const DEFAULT_SSH_USER: &str = "ldevuser";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct DenverConfig {
    pub(crate) config: ChannelConfig,
    pub(crate) instance: InstanceConfig,
    pub(crate) user: UserConfig,
    #[serde(default)]
    pub(crate) providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ChannelConfig {
    pub(crate) channel: String,
    pub(crate) rbi_url: String,
    pub(crate) update_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct InstanceConfig {
    pub(crate) name: String,
    pub(crate) provider: String,
    /// Memory in MB.
    pub(crate) vmem: u64,
    pub(crate) vcpu: u32,
    pub(crate) local_ip: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct UserConfig {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) email: String,
    pub(crate) pubkey: PathBuf,
    pub(crate) privkey: PathBuf,
    /// User data volume size in GB.
    pub(crate) user_data_size: u64,
    #[serde(default = "default_ssh_user")]
    pub(crate) ssh_user: String,
    /// `default` runs the bundled terminal, `iterm2` the bundled iTerm2
    /// script, anything else is run as a program.
    #[serde(default = "default_terminal")]
    pub(crate) terminal: String,
    #[serde(default)]
    pub(crate) terminal_arguments: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProviderConfig {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) location: String,
    pub(crate) hypervisor: String,
}

fn default_ssh_user() -> String {
    DEFAULT_SSH_USER.to_string()
}

fn default_terminal() -> String {
    DEFAULT_TERMINAL.to_string()
}

impl DenverConfig {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|err| DenverError::Malformed(format!("invalid config: {err}")).into())
    }

    /// Reads the explicit file if given, otherwise the first `config.toml`
    /// found on the search path.
    pub(crate) fn load(
        explicit: Option<&Path>,
        working_dir: &Path,
        home: Option<&Path>,
    ) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => config_search_paths(working_dir, home)
                .into_iter()
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| {
                    DenverError::NotFound(format!("no {CONFIG_FILE_NAME} found"))
                })?,
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to load config {}", path.display()))
    }

    pub(crate) fn provider(&self) -> Result<&ProviderConfig> {
        self.providers.get(&self.instance.provider).ok_or_else(|| {
            DenverError::NotFound(format!("VM Provider {} not found", self.instance.provider))
                .into()
        })
    }

    pub(crate) fn instance_settings(&self) -> InstanceSettings {
        InstanceSettings {
            name: self.instance.name.clone(),
            vcpu: self.instance.vcpu,
            vmem_mb: self.instance.vmem,
            local_ip: self.instance.local_ip.clone(),
            user_data_size_gb: self.user.user_data_size,
        }
    }

    pub(crate) fn image_source(&self) -> ImageSource {
        ImageSource {
            rbi_url: self.config.rbi_url.clone(),
            channel: self.config.channel.clone(),
        }
    }

    pub(crate) fn release_manifest_url(&self) -> String {
        format!(
            "{}/{}/manifest.json",
            self.config.update_url.trim_end_matches('/'),
            release_os()
        )
    }
}

pub(crate) fn config_search_paths(working_dir: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("."), working_dir.to_path_buf()];
    if let Some(home) = home {
        dirs.push(home.to_path_buf());
    }

    dirs.into_iter()
        .flat_map(|dir| {
            [
                dir.join(CONFIG_FILE_NAME),
                dir.join("conf").join(CONFIG_FILE_NAME),
            ]
        })
        .collect()
}

/// `DENVER_WORKING_DIR`, else the directory holding the running executable.
pub(crate) fn resolve_working_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(WORKING_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let exe = std::env::current_exe().context("failed to locate the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("executable has no parent directory: {}", exe.display()))
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Platform segment of release manifest urls.
pub(crate) fn release_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}
