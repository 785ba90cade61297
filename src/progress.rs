//! Progress output for user-facing status updates.
//!
//! Consumes job events on the interactive thread and prints one line per
//! finished item. In verbose mode, output is suppressed since tracing handles
//! everything.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};

use crate::batch::{JobSummary, Outcome};
use crate::job::JobKind;

/// Progress reporter for user-facing output
pub struct Progress {
    writer: Box<dyn Write>,
    /// When true, all output is suppressed (verbose mode uses tracing instead)
    silent: bool,
    /// When true, output is colorized
    colors_enabled: bool,
}

/// Check if we should use colors in output
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    io::stderr().is_terminal()
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Create a new progress reporter writing to stderr
    pub fn new() -> Self {
        Self::new_with_ui(false, should_use_colors())
    }

    /// Create a progress reporter that respects UI mode
    /// When verbose=true, output is suppressed (tracing handles it)
    pub fn new_with_ui(verbose: bool, colors_enabled: bool) -> Self {
        Self {
            writer: Box::new(io::stderr()),
            silent: verbose,
            colors_enabled,
        }
    }

    /// Create a progress reporter with a custom writer (for testing)
    #[cfg(test)]
    pub fn with_writer(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            silent: false,
            colors_enabled: false,
        }
    }

    /// Report the start of a job
    pub fn job_start(&mut self, kind: JobKind, total: usize, dry_run: bool) {
        if self.silent {
            return;
        }
        let mode = if dry_run { " (dry run)" } else { "" };
        let line = format!("Starting {} job: {} items{}", kind, total, mode);
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{}", line.bold());
        } else {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    /// Report one finished item
    pub fn item_done(&mut self, current: usize, total: usize, label: &str, outcome: &Outcome) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let counter = format!("[{}/{}]", current, total);
            let detail = match outcome {
                Outcome::Success(d) => d.green(),
                Outcome::NoMatch(d) => d.yellow(),
                Outcome::Error(d) => d.red(),
            };
            let _ = writeln!(
                self.writer,
                "{} {} {} {}",
                counter.cyan(),
                label.dimmed(),
                "→".cyan(),
                detail
            );
        } else {
            let tag = match outcome {
                Outcome::Success(_) => "ok",
                Outcome::NoMatch(_) => "no match",
                Outcome::Error(_) => "error",
            };
            let _ = writeln!(
                self.writer,
                "[{}/{}] {} -> {}: {}",
                current,
                total,
                label,
                tag,
                outcome.detail()
            );
        }
    }

    /// Report an error during operation (non-fatal)
    pub fn warn(&mut self, message: &str) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{} {}", "!".yellow().bold(), message.yellow());
        } else {
            let _ = writeln!(self.writer, "Warning: {}", message);
        }
    }

    /// Report report file written
    pub fn report_written(&mut self, path: &std::path::Path) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let _ = writeln!(
                self.writer,
                "{}",
                format!("Report saved to: {}", path.display()).dimmed()
            );
        } else {
            let _ = writeln!(self.writer, "Report saved to: {}", path.display());
        }
    }

    /// Report job complete
    pub fn job_complete(&mut self, summary: &JobSummary, dry_run: bool) {
        if self.silent {
            return;
        }
        let _ = writeln!(self.writer);
        let line = format!(
            "{}/{} items done: {} ok, {} need manual handling, {} failed",
            summary.completed(),
            summary.total,
            summary.succeeded,
            summary.no_match,
            summary.failed
        );

        if dry_run {
            if self.colors_enabled {
                let _ = writeln!(self.writer, "{}", format!("Dry run complete. {}", line).dimmed());
            } else {
                let _ = writeln!(self.writer, "Dry run complete. {}", line);
            }
        } else if self.colors_enabled {
            let mark = if summary.failed == 0 {
                "✓".green().bold()
            } else {
                "✗".red().bold()
            };
            let _ = writeln!(self.writer, "{} {}", mark, line);
        } else {
            let _ = writeln!(self.writer, "Job complete. {}", line);
        }

        if summary.stopped {
            self.warn(&format!("stopped early; {} items were not started", summary.skipped));
        }
    }
}
