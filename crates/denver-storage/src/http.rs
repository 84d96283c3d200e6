use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use denver_core::DenverError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::debug;

use crate::{file_name_from_url, Storage};

/// Receives `(downloaded, total)` after every chunk.
pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

pub struct HttpStorage {
    client: Client,
    progress: Option<ProgressFn>,
}

impl HttpStorage {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, downloaded: u64, total: Option<u64>) {
        if let Some(progress) = &self.progress {
            progress(downloaded, total);
        }
    }
}

impl Storage for HttpStorage {
    fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        let dest = dest_dir.join(file_name);
        let part_path = dest_dir.join(format!("{file_name}.part"));

        debug!(url, dest = %dest.display(), "downloading");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| DenverError::Transport(format!("GET {url} failed: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DenverError::NotFound(format!("file not found: {url}")).into());
        }
        if !status.is_success() {
            return Err(DenverError::Transport(format!("GET {url} returned {status}")).into());
        }

        fs::create_dir_all(dest_dir)
            .with_context(|| format!("failed to create {}", dest_dir.display()))?;
        let total = response.content_length();
        let result = stream_to_file(&mut response, &part_path, |downloaded| {
            self.report(downloaded, total)
        });
        let downloaded = match result {
            Ok(downloaded) => downloaded,
            Err(err) => {
                let _ = fs::remove_file(&part_path);
                return Err(err);
            }
        };
        // Streamed responses only learn their size at the end.
        self.report(downloaded, Some(downloaded));

        fs::rename(&part_path, &dest).with_context(|| {
            format!(
                "failed to move downloaded file into place: {}",
                dest.display()
            )
        })?;
        Ok(dest)
    }
}

/// Returns the number of bytes written.
fn stream_to_file<R, F>(reader: &mut R, path: &Path, mut on_chunk: F) -> Result<u64>
where
    R: Read,
    F: FnMut(u64),
{
    let mut file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut buffer = [0_u8; 64 * 1024];
    let mut downloaded = 0_u64;
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|err| DenverError::Transport(format!("download interrupted: {err}")))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .with_context(|| format!("failed to write {}", path.display()))?;
        downloaded += read as u64;
        on_chunk(downloaded);
    }
    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(downloaded)
}
