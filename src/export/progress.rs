//! Terminal progress for export runs

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, IsTerminal};

/// Task-level progress; the total grows as each project's tasks are listed
#[derive(Clone)]
pub struct ExportProgress {
    bar: ProgressBar,
}

impl ExportProgress {
    /// Visible only when requested and stderr is a terminal
    pub fn new(enabled: bool) -> Self {
        if !enabled || !io::stderr().is_terminal() {
            return Self::hidden();
        }

        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tasks {msg}",
        ) {
            bar.set_style(style.progress_chars("█▓▒░ "));
        }
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn add_tasks(&self, count: usize) {
        self.bar.inc_length(count as u64);
    }

    pub fn task_done(&self) {
        self.bar.inc(1);
    }

    pub fn set_project(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}
