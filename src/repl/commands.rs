//! Slash command parsing for the tutor-chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without submitting a question.

/// A parsed REPL command.
///
/// These commands control the session and are not submitted as questions.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Open a fresh blank chat.
    New,

    /// Open a chat by id, resolving it remotely or from the cache.
    Open(String),

    /// Edit a previous message by its 1-based position and resubmit.
    Edit(usize, String),

    /// Toggle the bookmark on a message by its 1-based position.
    Bookmark(usize),

    /// Flag the next question as carrying whiteboard content.
    Board(bool),

    /// List known sessions.
    Sessions,

    /// Delete a chat by id.
    Delete(String),

    /// Mark the current chat's remote session as ended.
    End,

    /// Print the current chat transcript.
    History,

    /// Display help information.
    Help,

    /// Exit the application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ReplCommand)` if the input is a command, or `None` if it
/// should be submitted as a question.
pub fn parse_command(input: &str) -> Option<ReplCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ReplCommand::New,
        "open" => match argument {
            Some(id) => ReplCommand::Open(id.to_string()),
            None => ReplCommand::Invalid("/open requires a chat id".to_string()),
        },
        "edit" => parse_edit_command(argument),
        "bookmark" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => ReplCommand::Bookmark(n),
                _ => ReplCommand::Invalid("/bookmark expects a message number".to_string()),
            },
            None => ReplCommand::Invalid("/bookmark requires a message number".to_string()),
        },
        "board" => match argument.and_then(parse_on_off) {
            Some(value) => ReplCommand::Board(value),
            None => ReplCommand::Invalid("/board expects 'on' or 'off'".to_string()),
        },
        "sessions" => ReplCommand::Sessions,
        "delete" => match argument {
            Some(id) => ReplCommand::Delete(id.to_string()),
            None => ReplCommand::Invalid("/delete requires a chat id".to_string()),
        },
        "end" => ReplCommand::End,
        "history" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => ReplCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_edit_command(argument: Option<&str>) -> ReplCommand {
    let Some(arg) = argument else {
        return ReplCommand::Invalid("/edit requires a message number and new text".to_string());
    };
    let mut parts = arg.splitn(2, ' ');
    let number = parts.next().unwrap();
    let Ok(n) = number.parse::<usize>() else {
        return ReplCommand::Invalid("/edit expects a message number first".to_string());
    };
    if n == 0 {
        return ReplCommand::Invalid("/edit expects a message number first".to_string());
    }
    let Some(text) = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return ReplCommand::Invalid("/edit requires the new text".to_string());
    };
    ReplCommand::Edit(n, text.to_string())
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Open a fresh blank chat
  /open <id>             Open a chat by id
  /edit <n> <text>       Edit message n and resubmit from there
  /bookmark <n>          Toggle the bookmark on message n
  /board on|off          Attach whiteboard content to the next question
  /sessions              List known sessions
  /delete <id>           Delete a chat
  /end                   End the current remote session
  /history               Print the current transcript
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ReplCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ReplCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ReplCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ReplCommand::Quit));
    }

    #[test]
    fn parse_new_and_open() {
        assert_eq!(parse_command("/new"), Some(ReplCommand::New));
        assert_eq!(
            parse_command("/open chat-42"),
            Some(ReplCommand::Open("chat-42".to_string()))
        );
        assert_eq!(
            parse_command("/open"),
            Some(ReplCommand::Invalid("/open requires a chat id".to_string()))
        );
    }

    #[test]
    fn parse_edit() {
        assert_eq!(
            parse_command("/edit 2 What about 1/4?"),
            Some(ReplCommand::Edit(2, "What about 1/4?".to_string()))
        );
        assert!(matches!(
            parse_command("/edit zero text"),
            Some(ReplCommand::Invalid(msg)) if msg.contains("number")
        ));
        assert!(matches!(
            parse_command("/edit 2"),
            Some(ReplCommand::Invalid(msg)) if msg.contains("text")
        ));
    }

    #[test]
    fn parse_bookmark() {
        assert_eq!(parse_command("/bookmark 3"), Some(ReplCommand::Bookmark(3)));
        assert!(matches!(
            parse_command("/bookmark"),
            Some(ReplCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/bookmark 0"),
            Some(ReplCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_board_toggle() {
        assert_eq!(parse_command("/board on"), Some(ReplCommand::Board(true)));
        assert_eq!(parse_command("/board off"), Some(ReplCommand::Board(false)));
        assert!(matches!(
            parse_command("/board maybe"),
            Some(ReplCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn parse_session_management() {
        assert_eq!(parse_command("/sessions"), Some(ReplCommand::Sessions));
        assert_eq!(
            parse_command("/delete chat-42"),
            Some(ReplCommand::Delete("chat-42".to_string()))
        );
        assert_eq!(parse_command("/end"), Some(ReplCommand::End));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Explique les fractions"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(!help.is_empty());
        assert!(help.contains("/quit"));
        assert!(help.contains("/new"));
        assert!(help.contains("/bookmark"));
    }
}
