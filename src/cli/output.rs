// Output formatting utilities

use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_BLUE: &str = "\x1b[34m";
const ANSI_FG_CYAN: &str = "\x1b[36m";

const MAX_RULE_WIDTH: usize = 72;

/// Decides whether and how operator-facing text is colored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// Colors on when stdout is a terminal and `NO_COLOR` is unset
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").map_or(false, |v| !v.is_empty());
        Self {
            enabled: !no_color && std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn colored() -> Self {
        Self { enabled: true }
    }

    fn paint(&self, codes: &[&str], text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{}{}{}", codes.concat(), text, ANSI_RESET)
    }

    pub fn info(&self, text: &str) -> String {
        format!("{} {}", self.paint(&[ANSI_FG_BLUE], "[INFO]"), text)
    }

    pub fn success(&self, text: &str) -> String {
        format!("{} {}", self.paint(&[ANSI_FG_GREEN], "[OK]"), text)
    }

    pub fn warning(&self, text: &str) -> String {
        format!("{} {}", self.paint(&[ANSI_FG_YELLOW], "[WARN]"), text)
    }

    pub fn error(&self, text: &str) -> String {
        format!("{} {}", self.paint(&[ANSI_FG_RED], "[ERROR]"), text)
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint(&[ANSI_BOLD, ANSI_FG_CYAN], text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(&[ANSI_BOLD], text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(&[ANSI_DIM], text)
    }
}

/// Width of horizontal rules, bounded by the terminal when one is attached
pub fn rule_width() -> usize {
    match terminal_size() {
        Some((Width(width), _)) => (width as usize).min(MAX_RULE_WIDTH),
        None => MAX_RULE_WIDTH,
    }
}

/// Numbered stage header, e.g. `[3/8] Docker`
pub fn format_step_header(palette: &Palette, index: usize, total: usize, title: &str, width: usize) -> String {
    let rule = "=".repeat(width.max(title.len() + 8));
    format!(
        "\n{}\n{}\n{}",
        palette.heading(&rule),
        palette.heading(&format!("[{}/{}] {}", index, total, title)),
        palette.heading(&rule)
    )
}

/// Yes/no rendering for summary lines
pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
