//! Per-list progress lines.
//!
//! On a terminal each list being imported gets a spinner that is cleared when
//! the list is done. Elsewhere the lines are hidden and the log is the only
//! report.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Width of the list tag column
const PREFIX_WIDTH: usize = 24;

fn list_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:<24.cyan.bold} {wide_msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Owns the `MultiProgress` all list lines and log output are drawn through.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Draw only when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Never draw (tests, dry runs, piped output).
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Spinner line for one list, prefixed with its (truncated) tag.
    ///
    /// Hidden when not on a terminal. Callers update it with `set_message` and
    /// remove it with `finish_and_clear`.
    pub fn list_line(&self, tag: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(list_style());
        pb.set_prefix(tag.chars().take(PREFIX_WIDTH).collect::<String>());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// For routing log lines around the spinners
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// `1234567` → `1,234,567`
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.char_indices() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
