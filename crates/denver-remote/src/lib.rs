mod keys;
mod protocol;
mod ssh;
mod terminal;

use std::path::Path;

use anyhow::Result;

pub use keys::{ensure_key_pair, private_key_path, public_key_path};
pub use protocol::{push_file, read_ack};
pub use ssh::SshClient;
pub use terminal::{RawModeGuard, Viewport};

/// Command execution, file push and interactive shell on the guest.
pub trait RemoteShell: Send + Sync {
    /// Runs `command` and returns its standard output.
    fn cmd(&self, command: &str) -> Result<String>;

    fn copy(&self, local_file: &Path, remote_path: &str, mode: u32) -> Result<()>;

    fn terminal(&self) -> Result<()>;
}
