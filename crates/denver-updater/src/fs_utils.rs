use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

/// `true` for anything present at `path`, dangling symlinks included.
pub fn path_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to stat {}", path.display())),
    }
}

pub(crate) fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to stat {}", path.display()));
        }
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory {}", path.display()))
    } else {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))
    }
}

/// Copies a single file; refuses to replace an existing destination.
pub fn copy_file_exclusive(src: &Path, dst: &Path) -> Result<()> {
    let mut source =
        fs::File::open(src).with_context(|| format!("failed to open {}", src.display()))?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut dest = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .with_context(|| format!("failed to create {}", dst.display()))?;
    io::copy(&mut source, &mut dest).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;

    #[cfg(unix)]
    {
        let permissions = fs::metadata(src)
            .with_context(|| format!("failed to stat {}", src.display()))?
            .permissions();
        fs::set_permissions(dst, permissions)
            .with_context(|| format!("failed to set permissions on {}", dst.display()))?;
    }

    Ok(())
}

/// Mirrors the files under `src` into `dst`. Files that already exist in
/// `dst` are left alone.
pub fn copy_tree_missing_only(src: &Path, dst: &Path) -> Result<()> {
    let metadata =
        fs::metadata(src).with_context(|| format!("failed to stat {}", src.display()))?;
    if !metadata.is_dir() {
        return Err(anyhow!("expected a directory: {}", src.display()));
    }

    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry
            .file_type()
            .with_context(|| format!("failed to stat {}", src_path.display()))?
            .is_dir()
        {
            copy_tree_missing_only(&src_path, &dst_path)?;
            continue;
        }
        if path_exists(&dst_path)? {
            continue;
        }
        copy_file_exclusive(&src_path, &dst_path)?;
    }
    Ok(())
}

/// Hex encoded sha256 of the file at `path`.
pub fn file_checksum(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub(crate) fn bytes_checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
