use anyhow::{Context, Result};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};

/// Size of the remote pseudo terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub cols: u16,
    pub rows: u16,
}

impl Viewport {
    pub const FALLBACK: Viewport = Viewport { cols: 80, rows: 24 };

    /// Current size of the local terminal, or 80x24 when unknown.
    pub fn detect() -> Self {
        Self::from_probe(terminal::size().ok())
    }

    pub fn from_probe(size: Option<(u16, u16)>) -> Self {
        match size {
            Some((cols, rows)) if cols > 0 && rows > 0 => Self { cols, rows },
            _ => Self::FALLBACK,
        }
    }
}

/// Restores cooked mode on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn new() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}
