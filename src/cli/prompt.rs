// Interactive console: confirmation gates, free-text prompts and status lines

use crate::cli::output::Palette;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Operator-facing terminal.
///
/// Generic over its reader and writer through trait objects so tests can
/// script answers and capture everything that was printed.
pub struct Console<'a> {
    input: Box<dyn BufRead + 'a>,
    output: Box<dyn Write + 'a>,
    palette: Palette,
}

impl<'a> Console<'a> {
    pub fn new(input: impl BufRead + 'a, output: impl Write + 'a, palette: Palette) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            palette,
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Ask a yes/no question. Only an explicit `y` or `Y` counts as consent;
    /// empty input, EOF and anything else decline.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} (y/N):", question))?;
        let accepted = is_affirmative(&answer);
        log::debug!("confirm '{}' -> {}", question, accepted);
        Ok(accepted)
    }

    /// Read one line of free text. EOF yields an empty string.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{} ", prompt).context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read input")?;
        if read == 0 {
            // Keep the transcript tidy when stdin is closed
            writeln!(self.output).context("Failed to write output")?;
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).context("Failed to write output")
    }

    pub fn info(&mut self, text: &str) -> Result<()> {
        let line = self.palette.info(text);
        self.line(&line)
    }

    pub fn success(&mut self, text: &str) -> Result<()> {
        let line = self.palette.success(text);
        self.line(&line)
    }

    pub fn warning(&mut self, text: &str) -> Result<()> {
        let line = self.palette.warning(text);
        self.line(&line)
    }

    pub fn error(&mut self, text: &str) -> Result<()> {
        let line = self.palette.error(text);
        self.line(&line)
    }
}

/// The single-character affirmative answer
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}
