use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    Bzip2,
    Tar,
    Zip,
}

impl CompressionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bzip2 => "bz2",
            Self::Tar => "tar",
            Self::Zip => "zip",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "bz2" => Some(Self::Bzip2),
            "tar" => Some(Self::Tar),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Outermost container of `path`, judged by its last extension only.
    /// `box.tar.bz2` is `Bzip2`; once peeled, `box.tar` is `Tar`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
    }
}
