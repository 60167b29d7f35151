//! Logging and console output
//!
//! [`Logger`] owns all user-visible output of the command line tool: section
//! headings, status lines and the live progress line of a download. Library
//! diagnostics go through `tracing`; [`init_tracing`] installs the subscriber
//! for the binary.

use crate::download::DownloadSession;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects debug output for this
/// crate and `quiet` limits it to errors.
pub fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "layer_puller=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    pub start_time: Option<Instant>,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            start_time: Some(Instant::now()),
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            start_time: Some(Instant::now()),
        }
    }

    /// Main section heading
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n=== {} ===", title);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("ℹ️  {}", message);
        }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("✅ {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("⚠️  WARNING: {}", message);
        }
    }

    /// Errors are printed even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("❌ ERROR: {}", message);
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("   {}", message);
        }
    }

    /// Key-value pairs under a heading
    pub fn summary_kv(&self, title: &str, items: &[(&str, String)]) {
        if !self.quiet {
            println!("\n--- {} ---", title);
            for (key, value) in items {
                println!("  {}: {}", key, value);
            }
        }
    }

    pub fn download_started(&self, session: &DownloadSession) {
        if self.quiet {
            return;
        }
        let downloaded = session.downloaded();
        if downloaded > 0 {
            println!(
                "▶️  Resuming {} at {} of {}",
                session.file_name(),
                self.format_size(downloaded),
                self.format_size(session.total_size())
            );
        } else {
            println!(
                "▶️  Downloading {} ({}, {} layers)",
                session.file_name(),
                self.format_size(session.total_size()),
                session.catalog().len()
            );
        }
    }

    /// Redraw the single live progress line
    pub fn download_updated(&self, session: &DownloadSession) {
        if self.quiet {
            return;
        }

        let percentage = session.progress() * 100.0;
        let bar_width = 30;
        let filled = ((percentage / 100.0) * bar_width as f64) as usize;
        let filled = filled.min(bar_width);
        let bar = format!("[{}{}]", "█".repeat(filled), "░".repeat(bar_width - filled));

        print!("\r\x1b[K");
        print!("⏳ {} {:.1}% | ", bar, percentage);
        print!(
            "{} / {} | ",
            self.format_size(session.downloaded()),
            self.format_size(session.total_size())
        );
        print!("{} | ", self.format_speed(session.speed()));
        match session.estimated_time_remaining() {
            Some(eta) => print!("ETA: {}", self.format_duration(eta)),
            None => print!("ETA: calculating..."),
        }
        let _ = io::stdout().flush();
    }

    pub fn download_completed(&self, session: &DownloadSession) {
        if self.quiet {
            return;
        }
        // Terminates the live progress line, if one was drawn.
        println!();
        let elapsed = self
            .start_time
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.success(&format!(
            "Saved {} ({}) in {}",
            session.file_path().display(),
            self.format_size(session.current_size()),
            self.format_duration(elapsed)
        ));
    }

    /// Format file size in human-readable units
    pub fn format_size(&self, bytes: u64) -> String {
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else if bytes < 1024 * 1024 * 1024 {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m{}s", secs / 60, secs % 60)
        } else {
            format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    pub fn format_speed(&self, bytes_per_sec: u64) -> String {
        format!("{}/s", self.format_size(bytes_per_sec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        let logger = Logger::new_quiet();
        assert_eq!(logger.format_size(512), "512 B");
        assert_eq!(logger.format_size(1536), "1.5 KB");
        assert_eq!(logger.format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(logger.format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_duration_and_speed() {
        let logger = Logger::new(false);
        assert_eq!(logger.format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(logger.format_duration(Duration::from_secs(125)), "2m5s");
        assert_eq!(logger.format_duration(Duration::from_secs(3723)), "1h2m3s");
        assert_eq!(logger.format_speed(2048), "2.0 KB/s");
    }
}
