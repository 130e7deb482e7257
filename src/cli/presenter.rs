//! CLI presenter for output formatting

use std::time::Duration as StdDuration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::RecordingSummary;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(StdDuration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Elapsed time, with a bar when the recording has a fixed length
    pub fn format_progress(&self, elapsed_ms: u64, total_ms: Option<u64>) -> String {
        let elapsed_secs = elapsed_ms / 1000;
        let total_ms = match total_ms {
            Some(total) if total > 0 => total,
            _ => return format!("{:02}:{:02}", elapsed_secs / 60, elapsed_secs % 60),
        };

        let percent = (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0);
        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {:>3}s / {}s",
            "█".repeat(filled).cyan(),
            "░".repeat(empty),
            elapsed_secs,
            total_ms / 1000
        )
    }

    /// Update recording progress
    pub fn update_recording_progress(&self, elapsed_ms: u64, total_ms: Option<u64>) {
        let progress = self.format_progress(elapsed_ms, total_ms);
        self.update_spinner(&format!("Recording... {}", progress));
    }

    /// Print a key-value pair
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print a finished recording
    pub fn summary(&self, summary: &RecordingSummary) {
        self.key_value("file", &summary.path.to_string_lossy());
        self.key_value("container", summary.container.as_str());
        self.key_value("frames", &summary.frames.to_string());
        self.key_value("audio", &format_bytes(summary.payload_bytes));
        self.key_value("size", &format_bytes(summary.file_bytes));
        self.key_value("duration", &format_millis(summary.duration_ms));
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value < KIB {
        format!("{} B", bytes)
    } else if value < KIB * KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{:.1} MiB", value / (KIB * KIB))
    }
}

fn format_millis(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_progress_at_start() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(0, Some(10000));
        assert!(progress.contains("0s / 10s"));
    }

    #[test]
    fn format_progress_at_end() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(10000, Some(10000));
        assert!(progress.contains("10s / 10s"));
    }

    #[test]
    fn format_progress_open_ended() {
        let presenter = Presenter::new();
        assert_eq!(presenter.format_progress(75_500, None), "01:15");
        assert_eq!(presenter.format_progress(0, Some(0)), "00:00");
    }

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn millis_keep_three_digits() {
        assert_eq!(format_millis(1005), "1.005s");
        assert_eq!(format_millis(232), "0.232s");
    }
}
