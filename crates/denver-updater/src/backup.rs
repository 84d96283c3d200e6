use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs_utils::{path_exists, remove_path};

pub const BACKUP_SUFFIX: &str = ".old";

/// Moves a fixed set of paths aside before an update so they can be put
/// back if the update fails.
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl BackupManager {
    /// `paths` are relative to `root`.
    pub fn new(root: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn backup_path(&self, rel: &Path) -> PathBuf {
        let target = self.root.join(rel);
        let mut name = target.as_os_str().to_os_string();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Renames every present target to its backup name. Stale backups from
    /// an earlier run are dropped first.
    pub fn rename(&self) -> Result<()> {
        for rel in &self.paths {
            let target = self.root.join(rel);
            if !path_exists(&target)? {
                debug!(path = %target.display(), "nothing to back up");
                continue;
            }
            let backup = self.backup_path(rel);
            remove_path(&backup)?;
            fs::rename(&target, &backup).with_context(|| {
                format!(
                    "failed to back up {} to {}",
                    target.display(),
                    backup.display()
                )
            })?;
            debug!(path = %target.display(), "backed up");
        }
        Ok(())
    }

    /// Restores every backup over its target, discarding whatever the
    /// failed update left behind.
    pub fn rollback(&self) -> Result<()> {
        for rel in &self.paths {
            let backup = self.backup_path(rel);
            if !path_exists(&backup)? {
                continue;
            }
            let target = self.root.join(rel);
            remove_path(&target)?;
            fs::rename(&backup, &target).with_context(|| {
                format!(
                    "failed to restore {} from {}",
                    target.display(),
                    backup.display()
                )
            })?;
            info!(path = %target.display(), "restored from backup");
        }
        Ok(())
    }

    /// Deletes every backup left by `rename`.
    pub fn remove(&self) -> Result<()> {
        for rel in &self.paths {
            remove_path(&self.backup_path(rel))?;
        }
        Ok(())
    }
}
