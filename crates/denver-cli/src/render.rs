use std::io::IsTerminal;
use std::sync::Mutex;

use anstyle::{AnsiColor, Effects, Style};
use denver_storage::ProgressFn;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Status {
    Ok,
    Ko,
    Skip,
    Info,
}

impl Status {
    fn badge(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Ko => "[KO]",
            Self::Skip => "[SKIP]",
            Self::Info => "[INFO]",
        }
    }

    fn style(self) -> Style {
        let color = match self {
            Self::Ok => AnsiColor::Green,
            Self::Ko => AnsiColor::Red,
            Self::Skip | Self::Info => AnsiColor::Yellow,
        };
        Style::new()
            .fg_color(Some(color.into()))
            .effects(Effects::BOLD)
    }
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(std::io::stdout().is_terminal())
}

pub(crate) fn render_status_line(style: OutputStyle, status: Status, message: &str) -> String {
    let badge = match style {
        OutputStyle::Plain => status.badge().to_string(),
        OutputStyle::Rich => colorize(status.style(), status.badge()),
    };
    format!("{badge} {message}")
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

/// Progress callback for downloads, one bar per file. A bar is cleared once
/// the download reports `downloaded == total`; storage sends that last even
/// when the size was unknown. Plain output shows nothing.
pub(crate) fn download_progress(style: OutputStyle) -> Option<ProgressFn> {
    if style == OutputStyle::Plain {
        return None;
    }

    let current: Mutex<Option<ProgressBar>> = Mutex::new(None);
    Some(Box::new(move |downloaded, total| {
        let mut current = match current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let progress_bar = current.get_or_insert_with(|| new_download_bar(total));
        if let Some(total) = total {
            progress_bar.set_length(total);
        }
        progress_bar.set_position(downloaded);

        if total.is_some_and(|total| downloaded >= total) {
            if let Some(progress_bar) = current.take() {
                progress_bar.finish_and_clear();
            }
        }
    }))
}

fn new_download_bar(total: Option<u64>) -> ProgressBar {
    let progress_bar = ProgressBar::new(total.unwrap_or(0));
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.cyan.bold} {msg:<12} [{bar:20.cyan/blue}] {bytes:>10}/{total_bytes:10} {elapsed_precise}",
    ) {
        progress_bar.set_style(style.progress_chars("=>-"));
    }
    progress_bar.set_message("download");
    progress_bar
}
