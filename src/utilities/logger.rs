//! Progress reporting for pipeline stages.

use chrono::Local;

use crate::media::poller::PollAttempt;
use crate::pipeline::PipelineStage;
use crate::utilities::errors::EvalError;
use crate::utilities::printer::{Printer, PrinterColor};

/// Prints one short line before and after each blocking stage.
///
/// In verbose mode every line is prefixed with a local timestamp.
#[derive(Debug, Clone, Default)]
pub struct ProgressLogger {
    /// Prefix lines with timestamps.
    pub verbose: bool,
    /// Suppress all progress output.
    pub quiet: bool,
    printer: Printer,
}

impl ProgressLogger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            printer: Printer::default(),
        }
    }

    /// A logger that prints nothing.
    pub fn silent() -> Self {
        Self {
            verbose: false,
            quiet: true,
            printer: Printer::default(),
        }
    }

    pub fn with_printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    /// Format a progress line without printing it.
    pub fn format_line(&self, stage: PipelineStage, message: &str) -> String {
        if self.verbose {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            format!("[{}][{}]: {}", timestamp, stage.label(), message)
        } else {
            format!("[{}] {}", stage.label(), message)
        }
    }

    fn emit(&self, stage: PipelineStage, message: &str, color: PrinterColor) {
        if !self.quiet {
            self.printer.print(&self.format_line(stage, message), color);
        }
    }

    /// Stage is about to block.
    pub fn begin(&self, stage: PipelineStage, message: &str) {
        self.emit(stage, message, PrinterColor::BoldCyan);
    }

    /// Stage finished.
    pub fn done(&self, stage: PipelineStage, message: &str) {
        self.emit(stage, message, PrinterColor::BoldGreen);
    }

    /// Poller is about to back off.
    pub fn poll(&self, attempt: &PollAttempt) {
        let message = format!(
            "File state: {}, rechecking in {}s...",
            attempt.state,
            attempt.next_delay.as_secs()
        );
        self.emit(PipelineStage::Polling, &message, PrinterColor::Yellow);
    }

    /// Run aborted.
    pub fn failed(&self, error: &EvalError) {
        self.emit(
            error.stage(),
            &format!("Failed: {}", error),
            PrinterColor::BoldRed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_format() {
        let logger = ProgressLogger::new(false);
        assert_eq!(
            logger.format_line(PipelineStage::Uploading, "Uploading video..."),
            "[UPLOADING] Uploading video..."
        );
    }

    #[test]
    fn test_verbose_line_has_timestamp() {
        let logger = ProgressLogger::new(true);
        let line = logger.format_line(PipelineStage::Polling, "waiting");
        assert!(line.starts_with('['));
        assert!(line.ends_with("[POLLING]: waiting"));
    }
}
