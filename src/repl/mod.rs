//! Interactive REPL support for the tutor-chat binary.
//!
//! Slash-command parsing and output rendering live here so the binary stays
//! a thin loop around [`crate::TutorSession`].

mod commands;
mod render;

pub use commands::{ReplCommand, help_text, parse_command};
pub use render::{PlainTextRenderer, Renderer};
