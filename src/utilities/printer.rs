//! Colored console output.

use std::io::{self, IsTerminal, Write};

/// Colors used for progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterColor {
    Red,
    Green,
    Yellow,
    Cyan,
    BoldRed,
    BoldGreen,
    BoldYellow,
    BoldCyan,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Cyan => "\x1b[36m",
            Self::BoldRed => "\x1b[1;31m",
            Self::BoldGreen => "\x1b[1;32m",
            Self::BoldYellow => "\x1b[1;33m",
            Self::BoldCyan => "\x1b[1;36m",
        }
    }
}

/// ANSI reset code.
const RESET: &str = "\x1b[0m";

/// Stream a [`Printer`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stdout,
    Stderr,
}

/// Line printer with optional ANSI colors.
///
/// Colors are only emitted when the target is a terminal.
#[derive(Debug, Clone)]
pub struct Printer {
    target: Target,
    color: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(Target::Stdout)
    }
}

impl Printer {
    pub fn new(target: Target) -> Self {
        let color = match target {
            Target::Stdout => io::stdout().is_terminal(),
            Target::Stderr => io::stderr().is_terminal(),
        };
        Self { target, color }
    }

    /// Force colors on or off.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Format one line without writing it.
    pub fn format(&self, content: &str, color: PrinterColor) -> String {
        if self.color {
            format!("{}{}{}", color.ansi_code(), content, RESET)
        } else {
            content.to_string()
        }
    }

    /// Print a line in `color`.
    pub fn print(&self, content: &str, color: PrinterColor) {
        self.write_line(&self.format(content, color));
    }

    /// Print a line as-is.
    pub fn print_plain(&self, content: &str) {
        self.write_line(content);
    }

    fn write_line(&self, line: &str) {
        // Write errors (closed pipe) are ignored.
        let _ = match self.target {
            Target::Stdout => writeln!(io::stdout().lock(), "{}", line),
            Target::Stderr => writeln!(io::stderr().lock(), "{}", line),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_without_color_is_plain() {
        let printer = Printer::new(Target::Stdout).with_color(false);
        assert_eq!(printer.format("hello", PrinterColor::Green), "hello");
    }

    #[test]
    fn test_format_with_color_wraps_ansi() {
        let printer = Printer::new(Target::Stdout).with_color(true);
        assert_eq!(
            printer.format("hello", PrinterColor::BoldRed),
            "\x1b[1;31mhello\x1b[0m"
        );
    }
}
