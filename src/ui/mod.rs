//! Terminal progress output.

use std::io::IsTerminal;
use std::time::Duration;

use crate::api::PageProgress;

/// Spinner on stderr that tracks pagination progress.
///
/// Hidden when stderr is not a terminal or output is quiet.
pub struct PageSpinner {
    pb: indicatif::ProgressBar,
}

impl PageSpinner {
    /// Create a spinner, visible only when `enabled` and stderr is a terminal
    pub fn new(msg: &str, enabled: bool) -> Self {
        let pb = if enabled && std::io::stderr().is_terminal() {
            indicatif::ProgressBar::new_spinner()
        } else {
            indicatif::ProgressBar::hidden()
        };
        if let Ok(style) =
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { pb }
    }

    /// Update the message after a page lands
    pub fn update(&self, progress: &PageProgress) {
        self.pb.set_message(progress_message(progress));
    }

    /// Finish with success
    pub fn finish_with_success(&self, msg: &str) {
        self.pb.finish_with_message(format!("✓ {}", msg));
    }

    /// Finish with error
    pub fn finish_with_error(&self, msg: &str) {
        self.pb.abandon_with_message(format!("✗ {}", msg));
    }
}

fn progress_message(progress: &PageProgress) -> String {
    let pages = match progress.total_pages {
        Some(total) => format!("page {}/{}", progress.page, total),
        None => format!("page {}", progress.page),
    };
    match progress.total_size {
        Some(total) => format!("Fetching grants: {} ({}/{} records)", pages, progress.records, total),
        None => format!("Fetching grants: {} ({} records)", pages, progress.records),
    }
}
