//! Interactive tutor chat application.
//!
//! This binary provides a streaming REPL interface for the tutor chat API,
//! with local caching and offline fallback replies.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! tutor-chat
//!
//! # Point at a different API
//! tutor-chat --base-url https://tutor.example.com/api/v1/
//!
//! # Disable colors (useful for piping output)
//! tutor-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Open a fresh blank chat
//! - `/open <id>` - Open a chat by id
//! - `/edit <n> <text>` - Edit message n and resubmit
//! - `/bookmark <n>` - Toggle the bookmark on message n
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use tutorstream::repl::{PlainTextRenderer, Renderer, ReplCommand, help_text, parse_command};
use tutorstream::{
    Chat, ChatArgs, ChatConfig, ChatEvent, MessageRole, TurnOrigin, TurnOutcome, TutorSession,
    UserInput,
};

/// Main entry point for the tutor-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("tutor-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let session = TutorSession::new(&config)?;
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling at the prompt
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let mut chat = session.open_blank(&new_chat_id()).await;
    let mut board_next = false;

    if session.is_authenticated() {
        println!("Tutor Chat (chat: {})", chat.id);
    } else {
        println!("Tutor Chat (offline mode, chat: {})", chat.id);
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ReplCommand::Quit => {
                            println!("Au revoir !");
                            break;
                        }
                        ReplCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ReplCommand::New => {
                            chat = session.open_blank(&new_chat_id()).await;
                            board_next = false;
                            renderer.print_info(&format!("Opened blank chat {}", chat.id));
                        }
                        ReplCommand::Open(id) => {
                            chat = session.open(&id).await;
                            board_next = false;
                            renderer.print_info(&format!(
                                "Opened chat {} ({} messages)",
                                chat.id,
                                chat.messages.len()
                            ));
                        }
                        ReplCommand::Edit(n, text) => {
                            match user_message_id(&chat, n) {
                                Some(message_id) => {
                                    println!("Tutor:");
                                    let outcome = session
                                        .resend(&mut chat, &message_id, text)
                                        .await
                                        .expect("message id came from this chat");
                                    render_outcome(&mut renderer, &outcome);
                                }
                                None => renderer
                                    .print_error(&format!("no user message at position {n}")),
                            }
                        }
                        ReplCommand::Bookmark(n) => match message_id_at(&chat, n) {
                            Some(message_id) => {
                                match session.toggle_bookmark(&mut chat, &message_id).await {
                                    Some(true) => renderer.print_info("Bookmarked."),
                                    Some(false) => renderer.print_info("Bookmark removed."),
                                    None => renderer.print_error("message not found"),
                                }
                            }
                            None => {
                                renderer.print_error(&format!("no message at position {n}"))
                            }
                        },
                        ReplCommand::Board(value) => {
                            board_next = value;
                            if value {
                                renderer.print_info(
                                    "Whiteboard content will be attached to the next question.",
                                );
                            } else {
                                renderer.print_info("Whiteboard attachment cleared.");
                            }
                        }
                        ReplCommand::Sessions => match session.list_sessions().await {
                            Ok(sessions) => {
                                if sessions.is_empty() {
                                    renderer.print_info("No sessions.");
                                }
                                for summary in sessions {
                                    println!(
                                        "    {}  {}",
                                        summary.session_id,
                                        summary.title.as_deref().unwrap_or("(untitled)")
                                    );
                                }
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ReplCommand::Delete(id) => match session.delete_chat(&id).await {
                            Ok(()) => renderer.print_info(&format!("Deleted chat {id}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ReplCommand::End => match session.end_session(&chat).await {
                            Ok(()) => renderer.print_info("Session ended."),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ReplCommand::History => {
                            print_history(&chat);
                        }
                        ReplCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - drive one exchange
                let input = if board_next {
                    board_next = false;
                    UserInput::text(line).with_whiteboard(None, None)
                } else {
                    UserInput::text(line)
                };

                println!("Tutor:");
                let outcome = stream_exchange(&session, &mut chat, input, &mut renderer).await;
                render_outcome(&mut renderer, &outcome);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nAu revoir !");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn new_chat_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Drive one exchange while printing deltas as they arrive.
async fn stream_exchange(
    session: &TutorSession,
    chat: &mut Chat,
    input: UserInput,
    renderer: &mut PlainTextRenderer,
) -> TurnOutcome {
    let mut events = session.subscribe();
    let send = session.send(chat, input);
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            event = events.recv() => {
                if let Ok(ChatEvent::Delta { text, .. }) = event {
                    renderer.print_text(&text);
                }
            }
        }
    };

    // Deltas published just before completion may still be queued
    while let Ok(event) = events.try_recv() {
        if let ChatEvent::Delta { text, .. } = event {
            renderer.print_text(&text);
        }
    }

    outcome
}

fn render_outcome(renderer: &mut PlainTextRenderer, outcome: &TurnOutcome) {
    match outcome.origin {
        TurnOrigin::Streamed => renderer.finish_response(),
        TurnOrigin::Fallback => {
            if let Some(message) = &outcome.message {
                renderer.print_fallback(&message.content);
            }
            renderer.finish_response();
        }
        TurnOrigin::Empty => renderer.print_info("(no response)"),
    }
    if let Some(warning) = &outcome.warning {
        renderer.print_warning(warning);
    }
}

fn print_history(chat: &Chat) {
    if chat.messages.is_empty() {
        println!("    (empty chat)");
        return;
    }
    for (i, message) in chat.messages.iter().enumerate() {
        let role = match message.role {
            MessageRole::User => "You",
            MessageRole::Assistant => "Tutor",
            MessageRole::System => "System",
        };
        let bookmark = if message.is_bookmarked { " *" } else { "" };
        let board = if message.has_whiteboard { " [board]" } else { "" };
        println!("    {}. {role}{bookmark}{board}: {}", i + 1, message.content);
    }
}

/// The id of the n-th (1-based) message, regardless of role.
fn message_id_at(chat: &Chat, n: usize) -> Option<String> {
    chat.messages.get(n - 1).map(|m| m.id.clone())
}

/// The id of the n-th (1-based) message, if it is a user message.
fn user_message_id(chat: &Chat, n: usize) -> Option<String> {
    chat.messages
        .get(n - 1)
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.id.clone())
}
