use anyhow::{Context, Result};
use denver_core::DenverError;
use regex::Regex;

const HOST_ONLY_ADAPTER: &str = r#"hostonlyadapter2="(.*)""#;
const ROOT_MEDIUM: &str = r#""SAS-0-0"="(.*)""#;
const USER_DATA_MEDIUM: &str = r#""SAS-1-0"="(.*)""#;
const CREATED_INTERFACE: &str = r"Interface '([^']+)' was successfully created";
const LISTED_VM: &str = r#"(?m)^\s*"(.*)" \{[^}]*\}\s*$"#;

/// Identifiers recovered from `showvminfo --machinereadable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmDescription {
    pub host_only_adapter: String,
    pub root_medium: String,
    pub user_data_medium: String,
}

pub fn describe(machine_readable: &str) -> Result<VmDescription> {
    Ok(VmDescription {
        host_only_adapter: capture(HOST_ONLY_ADAPTER, machine_readable, "host-only adapter")?,
        root_medium: capture(ROOT_MEDIUM, machine_readable, "root volume")?,
        user_data_medium: capture(USER_DATA_MEDIUM, machine_readable, "user data volume")?,
    })
}

/// Name of the interface reported by `hostonlyif create`.
pub fn parse_created_interface(output: &str) -> Result<String> {
    capture(CREATED_INTERFACE, output, "created host-only interface")
}

/// Names from `list vms` / `list runningvms`. Each entry is `"<name>" {<uuid>}`;
/// names may contain spaces.
pub fn parse_vm_names(list_output: &str) -> Result<Vec<String>> {
    let re = Regex::new(LISTED_VM).context("invalid pattern for listed vm")?;
    Ok(re
        .captures_iter(list_output)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
        .collect())
}

fn capture(pattern: &str, haystack: &str, what: &str) -> Result<String> {
    let re = Regex::new(pattern).with_context(|| format!("invalid pattern for {what}"))?;
    re.captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().to_string())
        .filter(|value| !value.is_empty() && value != "none")
        .ok_or_else(|| {
            DenverError::NotFound(format!("no {what} found in hypervisor output")).into()
        })
}
