use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use denver_core::{parse_build_version, ImageManifest, ReleaseManifest};

use crate::engine::{FetchedManifest, UpdatePolicy};
use crate::fs_utils::{
    bytes_checksum, copy_file_exclusive, copy_tree_missing_only, file_checksum, path_exists,
};
use crate::layout::WorkingLayout;

/// Self update of the orchestrator bundle. Fresh when the running build is
/// at least as new as the published one.
#[derive(Debug, Clone)]
pub struct ReleasePolicy {
    local_version: String,
    working_dir: PathBuf,
    bundle_name: String,
}

impl ReleasePolicy {
    pub fn new(local_version: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_version: local_version.into(),
            working_dir: working_dir.into(),
            bundle_name: "denver".to_string(),
        }
    }

    pub fn local_version(&self) -> &str {
        &self.local_version
    }
}

impl UpdatePolicy for ReleasePolicy {
    type Manifest = ReleaseManifest;

    fn label(&self) -> &'static str {
        "release"
    }

    fn parse_manifest(&self, bytes: &[u8]) -> Result<ReleaseManifest> {
        ReleaseManifest::from_json_slice(bytes)
    }

    fn is_up_to_date(&self, remote: &FetchedManifest) -> Result<bool> {
        let local = parse_build_version("local build version", &self.local_version)?;
        let remote = self.parse_manifest(&remote.bytes)?.build_version()?;
        Ok(local >= remote)
    }

    fn artifact_url(&self, manifest: &ReleaseManifest) -> String {
        manifest.url.clone()
    }

    fn expected_size(&self, manifest: &ReleaseManifest) -> Result<u64> {
        manifest.file_size_bytes()
    }

    fn protected_paths(&self) -> Vec<PathBuf> {
        WorkingLayout::release_protected_rels()
    }

    fn install(&self, staging_dir: &Path, _manifest_file: &Path) -> Result<()> {
        let staged = staging_dir.join(&self.bundle_name);
        let metadata = fs::metadata(&staged)
            .with_context(|| format!("release bundle missing: {}", staged.display()))?;
        if metadata.is_dir() {
            copy_tree_missing_only(&staged, &self.working_dir)
        } else {
            copy_file_exclusive(&staged, &self.working_dir.join(&self.bundle_name))
        }
    }
}

/// Base image of one channel. Fresh when the local manifest is byte for
/// byte the published one.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    working_dir: PathBuf,
    manifest_rel: PathBuf,
    image_rel: PathBuf,
    artifact_url: String,
}

impl ImagePolicy {
    pub fn new(layout: &WorkingLayout, channel: &str, artifact_url: impl Into<String>) -> Self {
        Self {
            working_dir: layout.root().to_path_buf(),
            manifest_rel: WorkingLayout::image_manifest_rel(channel),
            image_rel: WorkingLayout::image_rel(channel),
            artifact_url: artifact_url.into(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.working_dir.join(&self.manifest_rel)
    }

    pub fn image_path(&self) -> PathBuf {
        self.working_dir.join(&self.image_rel)
    }
}

impl UpdatePolicy for ImagePolicy {
    type Manifest = ImageManifest;

    fn label(&self) -> &'static str {
        "image"
    }

    fn parse_manifest(&self, bytes: &[u8]) -> Result<ImageManifest> {
        ImageManifest::from_json_slice(bytes)
    }

    fn known_stale(&self) -> Result<bool> {
        Ok(!path_exists(&self.manifest_path())?)
    }

    fn is_up_to_date(&self, remote: &FetchedManifest) -> Result<bool> {
        let local = file_checksum(&self.manifest_path())?;
        Ok(local == bytes_checksum(&remote.bytes))
    }

    fn artifact_url(&self, _manifest: &ImageManifest) -> String {
        self.artifact_url.clone()
    }

    fn expected_size(&self, manifest: &ImageManifest) -> Result<u64> {
        Ok(manifest.file_size)
    }

    fn protected_paths(&self) -> Vec<PathBuf> {
        vec![self.image_rel.clone(), self.manifest_rel.clone()]
    }

    fn install(&self, staging_dir: &Path, manifest_file: &Path) -> Result<()> {
        let image_name = self
            .image_rel
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("box.vdi"));
        copy_file_exclusive(&staging_dir.join(image_name), &self.image_path())?;
        copy_file_exclusive(manifest_file, &self.manifest_path())
    }
}
