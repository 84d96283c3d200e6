mod actions;
mod cancel;
mod compression;
mod error;
mod manifest;
mod state;

pub use actions::{Action, ActionChain};
pub use cancel::CancelToken;
pub use compression::CompressionKind;
pub use error::{error_kind, DenverError, ErrorKind};
pub use manifest::{parse_build_version, ImageManifest, ReleaseManifest};
pub use state::{InstanceState, ReadinessTransition, StateCell};
