use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use denver_core::CancelToken;
use tracing::debug;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// A private temporary directory. Removed on drop, or as soon as the
/// cancel token fires.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    released: CancelToken,
    watcher: Option<JoinHandle<()>>,
}

impl ScratchDir {
    pub fn create(prefix: &str, cancel: &CancelToken) -> Result<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let sequence = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "{prefix}-{}-{nanos}-{sequence}",
            std::process::id()
        ));
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create scratch dir {}", path.display()))?;

        let released = CancelToken::new();
        let watcher = {
            let cancel = cancel.clone();
            let released = released.clone();
            let path = path.clone();
            thread::spawn(move || loop {
                if released.is_cancelled() {
                    return;
                }
                if cancel.wait_timeout(WATCH_INTERVAL) {
                    if !released.is_cancelled() {
                        debug!(path = %path.display(), "cancelled, removing scratch dir");
                        let _ = fs::remove_dir_all(&path);
                    }
                    return;
                }
            })
        };

        Ok(Self {
            path,
            released,
            watcher: Some(watcher),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.released.cancel();
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
        let _ = fs::remove_dir_all(&self.path);
    }
}
