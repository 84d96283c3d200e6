use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

const INSECURE_PUBLIC_KEY: &str = include_str!("../keys/insecure_id_rsa.pub");
const INSECURE_PRIVATE_KEY: &str = include_str!("../keys/insecure_id_rsa");

pub fn private_key_path(key_dir: &Path) -> PathBuf {
    key_dir.join("id_rsa")
}

pub fn public_key_path(key_dir: &Path) -> PathBuf {
    key_dir.join("id_rsa.pub")
}

/// Installs the insecure key pair baked into the base image unless a private
/// key is already present.
pub fn ensure_key_pair(key_dir: &Path) -> Result<PathBuf> {
    let private = private_key_path(key_dir);
    if private.exists() {
        return Ok(private);
    }

    info!(dir = %key_dir.display(), "insecure key pair not found, installing it");
    fs::create_dir_all(key_dir)
        .with_context(|| format!("failed to create {}", key_dir.display()))?;
    write_key(&public_key_path(key_dir), INSECURE_PUBLIC_KEY, 0o644)?;
    write_key(&private, INSECURE_PRIVATE_KEY, 0o600)?;
    Ok(private)
}

fn write_key(path: &Path, contents: &str, mode: u32) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}
