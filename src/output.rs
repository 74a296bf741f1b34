//! Output rendering abstraction for ai.
//!
//! Defines the [`Renderer`] trait that decouples streamed model output from
//! the display layer. [`StdoutRenderer`] prints tokens directly to the
//! terminal.

use colored::Colorize;
use std::io::{self, Write};

/// Trait for rendering LLM output as it streams in.
pub trait Renderer {
    /// Render a single token-delta as it arrives.
    fn render_token(&mut self, token: &str);

    /// Called when the reply ends, normally or by interruption.
    fn render_done(&mut self);

    /// Called when an error occurs during streaming.
    fn render_error(&mut self, err: &str);
}

/// Renders streaming LLM output directly to stdout.
///
/// Each token is printed immediately with an explicit flush so the user
/// sees a "typing" effect. Buffers the raw text for accurate visual line
/// counting when the reply is reprinted with formatting.
pub struct StdoutRenderer {
    buffer: String,
}

impl StdoutRenderer {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Calculates the number of cursor-up movements needed to erase
    /// all streamed output (raw text + render_done output).
    ///
    /// Accounts for terminal line wrapping by using the actual terminal width.
    pub fn visual_line_count(&self) -> usize {
        let width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80)
            .max(1);
        visual_lines(&self.buffer, width)
    }
}

impl Default for StdoutRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor-up count to reach the first streamed line from below the
/// `render_done` output.
fn visual_lines(text: &str, width: usize) -> usize {
    let content_lines: usize = text
        .split('\n')
        .map(|line| {
            let len = line.chars().count();
            if len == 0 {
                1
            } else {
                (len + width - 1) / width
            }
        })
        .sum();

    // -1: the first line needs no cursor-up; +2: render_done's two newlines
    content_lines.saturating_sub(1) + 2
}

impl Renderer for StdoutRenderer {
    fn render_token(&mut self, token: &str) {
        self.buffer.push_str(token);
        print!("{}", token);
        // Flush immediately so each token appears as it arrives
        io::stdout().flush().ok();
    }

    fn render_done(&mut self) {
        println!();
        println!();
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}
