use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use denver_core::CompressionKind;
use tracing::{debug, warn};

/// Turns a downloaded artifact into its final form.
pub trait Decompressor: Send + Sync {
    /// Unpacks `path` into `dest_dir` and returns the path of the result:
    /// the expanded file for a compressed stream, `dest_dir` itself once an
    /// archive (tar, zip) has been extracted into it. Uncompressed inputs
    /// come back unchanged.
    fn decompress(&self, path: &Path, dest_dir: &Path, expected_size: u64) -> Result<PathBuf>;
}

/// Peels one compression layer per pass (`box.tar.bz2` goes through bzip2
/// and then tar) using the system tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiDecompressor;

impl Decompressor for MultiDecompressor {
    fn decompress(&self, path: &Path, dest_dir: &Path, expected_size: u64) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)
            .with_context(|| format!("failed to create {}", dest_dir.display()))?;

        let mut current = path.to_path_buf();
        let mut first_pass = true;
        while let Some(kind) = CompressionKind::from_path(&current) {
            let next = match kind {
                CompressionKind::Bzip2 => {
                    let output = strip_extension(&current, dest_dir)?;
                    debug!(input = %current.display(), output = %output.display(), "expanding bzip2");
                    expand_bzip2(&current, &output)?;
                    if first_pass {
                        check_size(&output, expected_size)?;
                    }
                    Some(output)
                }
                CompressionKind::Tar | CompressionKind::Zip => {
                    debug!(
                        kind = kind.as_str(),
                        input = %current.display(),
                        dest = %dest_dir.display(),
                        "extracting archive"
                    );
                    if kind == CompressionKind::Tar {
                        extract_tar(&current, dest_dir)?;
                    } else {
                        extract_zip(&current, dest_dir)?;
                    }
                    None
                }
            };
            if current != path {
                fs::remove_file(&current).with_context(|| {
                    format!("failed to remove intermediate {}", current.display())
                })?;
            }
            match next {
                Some(output) => current = output,
                // Archive members land in dest_dir under their own names.
                None => return Ok(dest_dir.to_path_buf()),
            }
            first_pass = false;
        }
        Ok(current)
    }
}

fn strip_extension(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .ok_or_else(|| anyhow!("archive has no file name: {}", path.display()))?;
    Ok(dest_dir.join(stem))
}

fn check_size(output: &Path, expected_size: u64) -> Result<()> {
    if expected_size == 0 {
        return Ok(());
    }
    let actual = fs::metadata(output)
        .with_context(|| format!("failed to stat {}", output.display()))?
        .len();
    if actual != expected_size {
        warn!(
            path = %output.display(),
            expected = expected_size,
            actual,
            "decompressed size differs from manifest"
        );
    }
    Ok(())
}

fn expand_bzip2(archive_path: &Path, output: &Path) -> Result<()> {
    let file = fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let result = run_command(
        Command::new("bzip2")
            .arg("-dc")
            .arg(archive_path)
            .stdout(Stdio::from(file)),
        "failed to decompress bzip2 archive",
    );
    if result.is_err() {
        let _ = fs::remove_file(output);
    }
    result
}

fn extract_tar(archive_path: &Path, dst: &Path) -> Result<()> {
    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract tar archive",
    )
}

fn extract_zip(archive_path: &Path, dst: &Path) -> Result<()> {
    let mut unzip_command = Command::new("unzip");
    unzip_command
        .arg("-q")
        .arg("-o")
        .arg(archive_path)
        .arg("-d")
        .arg(dst);
    if run_command(&mut unzip_command, "failed to extract zip archive with unzip").is_ok() {
        return Ok(());
    }

    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract zip archive with tar fallback",
    )
}

pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}
