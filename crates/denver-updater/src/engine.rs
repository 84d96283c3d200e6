use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use denver_core::{CancelToken, DenverError};
use denver_storage::Storage;
use tracing::{debug, error, info, warn};

use crate::backup::BackupManager;
use crate::decompress::Decompressor;
use crate::scratch::ScratchDir;

/// A manifest freshly pulled from the remote store.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// What differs between updatable artifacts: how freshness is judged, where
/// the payload comes from, and how it is put in place.
pub trait UpdatePolicy: Send + Sync {
    type Manifest;

    fn label(&self) -> &'static str;

    fn parse_manifest(&self, bytes: &[u8]) -> Result<Self::Manifest>;

    /// Answers "stale" without touching the network when local state makes
    /// the comparison pointless.
    fn known_stale(&self) -> Result<bool> {
        Ok(false)
    }

    fn is_up_to_date(&self, remote: &FetchedManifest) -> Result<bool>;

    fn artifact_url(&self, manifest: &Self::Manifest) -> String;

    fn expected_size(&self, manifest: &Self::Manifest) -> Result<u64>;

    /// Paths, relative to the working directory, replaced by `install`.
    fn protected_paths(&self) -> Vec<PathBuf>;

    fn install(&self, staging_dir: &Path, manifest_file: &Path) -> Result<()>;
}

/// Check and apply updates for one artifact.
pub struct UpdateEngine<P: UpdatePolicy> {
    manifest_url: String,
    storage: Arc<dyn Storage>,
    decompressor: Arc<dyn Decompressor>,
    backup: BackupManager,
    cancel: CancelToken,
    policy: P,
}

impl<P: UpdatePolicy> UpdateEngine<P> {
    pub fn new(
        working_dir: impl Into<PathBuf>,
        manifest_url: impl Into<String>,
        storage: Arc<dyn Storage>,
        decompressor: Arc<dyn Decompressor>,
        cancel: CancelToken,
        policy: P,
    ) -> Self {
        let backup = BackupManager::new(working_dir, policy.protected_paths());
        Self {
            manifest_url: manifest_url.into(),
            storage,
            decompressor,
            backup,
            cancel,
            policy,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn check_is_updated(&self) -> Result<bool> {
        if self.policy.known_stale()? {
            debug!(artifact = self.policy.label(), "no local state, update needed");
            return Ok(false);
        }
        let scratch = ScratchDir::create("denver-check", &self.cancel)?;
        let remote = self.fetch_manifest(scratch.path())?;
        let up_to_date = self.policy.is_up_to_date(&remote)?;
        debug!(artifact = self.policy.label(), up_to_date, "freshness checked");
        Ok(up_to_date)
    }

    /// Parsed remote manifest, for display.
    pub fn latest_manifest(&self) -> Result<P::Manifest> {
        let scratch = ScratchDir::create("denver-check", &self.cancel)?;
        let remote = self.fetch_manifest(scratch.path())?;
        self.policy.parse_manifest(&remote.bytes)
    }

    pub fn update(&self) -> Result<()> {
        let label = self.policy.label();
        let scratch = ScratchDir::create("denver-update", &self.cancel)?;

        info!(artifact = label, url = %self.manifest_url, "downloading manifest");
        let fetched = self.fetch_manifest(scratch.path())?;
        let manifest = self.policy.parse_manifest(&fetched.bytes)?;

        let artifact_url = self.policy.artifact_url(&manifest);
        info!(artifact = label, url = %artifact_url, "downloading artifact");
        let archive = self.storage.download(&artifact_url, scratch.path())?;

        if let Err(err) = self.stage_and_install(&archive, scratch.path(), &fetched, &manifest) {
            self.rollback(&err);
            return Err(err);
        }

        self.backup
            .remove()
            .with_context(|| format!("{label} updated but backups could not be removed"))?;
        info!(artifact = label, "update applied");
        Ok(())
    }

    fn stage_and_install(
        &self,
        archive: &Path,
        staging_dir: &Path,
        fetched: &FetchedManifest,
        manifest: &P::Manifest,
    ) -> Result<()> {
        let expected_size = self.policy.expected_size(manifest)?;
        let unpacked = self
            .decompressor
            .decompress(archive, staging_dir, expected_size)?;
        if unpacked != archive {
            fs::remove_file(archive)
                .with_context(|| format!("failed to remove archive {}", archive.display()))?;
        }

        self.backup.rename()?;
        self.policy.install(staging_dir, &fetched.path)
    }

    fn rollback(&self, cause: &anyhow::Error) {
        warn!(artifact = self.policy.label(), error = %format!("{cause:#}"), "update failed, rolling back");
        if let Err(rollback_err) = self.backup.rollback() {
            let err = DenverError::Unrecoverable(format!(
                "rollback of {} failed: {rollback_err:#}",
                self.policy.label()
            ));
            error!(error = %err, "installation left in an inconsistent state");
        }
    }

    fn fetch_manifest(&self, dest_dir: &Path) -> Result<FetchedManifest> {
        let path = self
            .storage
            .download(&self.manifest_url, dest_dir)
            .with_context(|| format!("failed to fetch {} manifest", self.policy.label()))?;
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(FetchedManifest { path, bytes })
    }
}
