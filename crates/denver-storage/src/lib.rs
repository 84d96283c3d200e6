use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};

mod http;
mod local;

pub use http::{HttpStorage, ProgressFn};
pub use local::LocalStorage;

/// Artifact storage backend.
pub trait Storage: Send + Sync {
    /// Fetches `url` into `dest_dir`, keeping the URL's file name. A missing
    /// object is reported as `DenverError::NotFound`.
    fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Picks a backend from the URL scheme.
pub fn storage_for(url: &str) -> Result<Arc<dyn Storage>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Arc::new(HttpStorage::new()?));
    }
    if url.starts_with("file://") || !url.contains("://") {
        return Ok(Arc::new(LocalStorage));
    }
    Err(anyhow!("unsupported storage URL scheme: {url}"))
}

pub(crate) fn file_name_from_url(url: &str) -> Result<&str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    let name = without_query.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name == "." || name == ".." {
        return Err(anyhow!("could not derive a file name from URL '{url}'"));
    }
    Ok(name)
}
