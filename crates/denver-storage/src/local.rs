use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use denver_core::DenverError;
use tracing::debug;

use crate::{file_name_from_url, Storage};

/// Mirror on the local filesystem; accepts `file://` URLs and plain paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let source = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        let file_name = file_name_from_url(url)?;
        let dest = dest_dir.join(file_name);

        fs::create_dir_all(dest_dir)
            .with_context(|| format!("failed to create {}", dest_dir.display()))?;
        debug!(source = %source.display(), dest = %dest.display(), "copying from local mirror");

        match fs::copy(&source, &dest) {
            Ok(_) => Ok(dest),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(DenverError::NotFound(
                format!("file not found: {}", source.display()),
            )
            .into()),
            Err(err) => Err(err).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    source.display(),
                    dest.display()
                )
            }),
        }
    }
}
