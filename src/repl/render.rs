//! Output rendering for the tutor-chat application.
//!
//! A trait-based rendering abstraction so the binary can stream deltas,
//! warnings, and fallback replies with or without ANSI styling.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for fallback replies).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for cyan text (used for bookmarks and metadata).
const ANSI_CYAN: &str = "\x1b[36m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a chunk of streamed response text.
    ///
    /// Called incrementally as deltas arrive.
    fn print_text(&mut self, text: &str);

    /// Print a fallback reply, styled distinctly from streamed text.
    fn print_fallback(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a non-blocking warning.
    fn print_warning(&mut self, warning: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);

    /// Called when streaming is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            use_color: true,
        }
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn print_fallback(&mut self, text: &str) {
        if self.use_color {
            print!("{ANSI_DIM}{text}{ANSI_RESET}");
        } else {
            print!("{text}");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("\nError: {error}");
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_CYAN}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn print_warning(&mut self, warning: &str) {
        if self.use_color {
            println!("{ANSI_YELLOW}Warning: {warning}{ANSI_RESET}");
        } else {
            println!("Warning: {warning}");
        }
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        println!("\n[interrupted]");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }
}
