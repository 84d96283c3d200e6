use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use denver_core::Action;
use denver_remote::RemoteShell;

const REMOTE_PUBLIC_KEY: &str = ".ssh/id_rsa.pub";
const REMOTE_PRIVATE_KEY: &str = ".ssh/id_rsa";
const AUTHORIZE_KEY_COMMAND: &str = "grep -qxF \"$(cat .ssh/id_rsa.pub)\" .ssh/authorized_keys 2>/dev/null || cat .ssh/id_rsa.pub >> .ssh/authorized_keys";

/// Guest-side identity of the developer, applied after every start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GuestUser {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) pubkey: PathBuf,
    pub(crate) privkey: PathBuf,
}

impl GuestUser {
    pub(crate) fn git_user_action(&self, remote: Arc<dyn RemoteShell>) -> Action {
        let user = self.clone();
        Box::new(move || set_git_user(remote.as_ref(), &user.name, &user.email))
    }

    pub(crate) fn user_key_action(&self, remote: Arc<dyn RemoteShell>) -> Action {
        let user = self.clone();
        Box::new(move || set_user_key(remote.as_ref(), &user.pubkey, &user.privkey))
    }
}

pub(crate) fn set_git_user(remote: &dyn RemoteShell, name: &str, email: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow!("no name configured"));
    }
    remote
        .cmd(&format!("git config --global user.name {}", shell_quote(name)))
        .context("failed to set the guest git user name")?;

    if email.is_empty() {
        return Err(anyhow!("no email configured"));
    }
    remote
        .cmd(&format!(
            "git config --global user.email {}",
            shell_quote(email)
        ))
        .context("failed to set the guest git user email")?;
    Ok(())
}

pub(crate) fn set_user_key(remote: &dyn RemoteShell, pubkey: &Path, privkey: &Path) -> Result<()> {
    remote
        .copy(pubkey, REMOTE_PUBLIC_KEY, 0o644)
        .with_context(|| format!("failed to push public key {}", pubkey.display()))?;
    remote
        .copy(privkey, REMOTE_PRIVATE_KEY, 0o600)
        .with_context(|| format!("failed to push private key {}", privkey.display()))?;
    remote
        .cmd(AUTHORIZE_KEY_COMMAND)
        .context("failed to authorize the public key on the guest")?;
    Ok(())
}

/// Single-quotes `value` for a POSIX shell.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
