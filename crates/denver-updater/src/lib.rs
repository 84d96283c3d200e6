mod backup;
mod decompress;
mod engine;
mod fs_utils;
mod layout;
mod policies;
mod scratch;

pub use backup::{BackupManager, BACKUP_SUFFIX};
pub use decompress::{Decompressor, MultiDecompressor};
pub use engine::{FetchedManifest, UpdateEngine, UpdatePolicy};
pub use fs_utils::{copy_file_exclusive, copy_tree_missing_only, file_checksum, path_exists};
pub use layout::WorkingLayout;
pub use policies::{ImagePolicy, ReleasePolicy};
pub use scratch::ScratchDir;
