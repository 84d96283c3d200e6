use std::path::{Path, PathBuf};

/// Paths of an installation, all under the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingLayout {
    root: PathBuf,
}

impl WorkingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf")
    }

    pub fn ssh_dir(&self) -> PathBuf {
        self.root.join(".ssh")
    }

    pub fn ssh_private_key_path(&self) -> PathBuf {
        self.ssh_dir().join("id_rsa")
    }

    pub fn user_data_path(&self) -> PathBuf {
        self.store_dir().join("userdata.vdi")
    }

    pub fn image_manifest_rel(channel: &str) -> PathBuf {
        Path::new("store").join(channel).join("manifest.json")
    }

    pub fn image_rel(channel: &str) -> PathBuf {
        Path::new("store").join(channel).join("box.vdi")
    }

    pub fn image_manifest_path(&self, channel: &str) -> PathBuf {
        self.root.join(Self::image_manifest_rel(channel))
    }

    pub fn image_path(&self, channel: &str) -> PathBuf {
        self.root.join(Self::image_rel(channel))
    }

    /// Paths replaced by a self update.
    pub fn release_protected_rels() -> Vec<PathBuf> {
        vec![
            PathBuf::from("denver"),
            PathBuf::from("tools"),
            Path::new("conf").join("config.dist.toml"),
        ]
    }
}
