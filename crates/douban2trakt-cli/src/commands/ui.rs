use history_sync_core::{LogProgress, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// Per-record progress: a bar on a terminal, periodic log lines otherwise.
pub enum RecordProgress {
    Bar(ProgressBar),
    Log(LogProgress),
}

impl RecordProgress {
    pub fn new(operation: &str, quiet: bool) -> Self {
        if !is_interactive() || quiet {
            tracing::info!(
                operation = "ui_init",
                mode = "non_interactive",
                "Progress bars disabled, using structured logging"
            );
            return Self::Log(LogProgress::new(operation, 25));
        }

        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        bar.set_message(operation.to_string());
        Self::Bar(bar)
    }
}

impl ProgressSink for RecordProgress {
    fn start(&mut self, total: usize) {
        match self {
            Self::Bar(bar) => bar.set_length(total as u64),
            Self::Log(log) => log.start(total),
        }
    }

    fn advance(&mut self, title: &str) {
        match self {
            Self::Bar(bar) => {
                bar.set_message(title.to_string());
                bar.inc(1);
            }
            Self::Log(log) => log.advance(title),
        }
    }

    fn finish(&mut self) {
        match self {
            Self::Bar(bar) => bar.finish_and_clear(),
            Self::Log(log) => log.finish(),
        }
    }
}

/// Spinner for a single long step.
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn new(message: String) -> Self {
        if !is_interactive() {
            tracing::info!(operation = "progress", message = %message, "Progress update");
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        bar.set_message(message);
        Self { bar: Some(bar) }
    }

    pub fn finish(self, message: String) {
        match self.bar {
            Some(bar) => bar.finish_with_message(message),
            None => tracing::info!(operation = "progress", message = %message, "Progress update"),
        }
    }
}
