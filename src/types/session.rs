use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Chat, Message, MessageRole};

/// One user-input/assistant-response pair as tracked by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Server-assigned exchange identifier.
    pub exchange_id: String,

    /// The user's input for this exchange.
    pub user_input: String,

    /// The assistant's response, absent if the exchange never completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_response: Option<String>,

    /// When the exchange was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Whether the user bookmarked this exchange.
    #[serde(default)]
    pub is_bookmarked: bool,

    /// Whether whiteboard content was attached to this exchange.
    #[serde(default)]
    pub has_whiteboard: bool,
}

/// A full server-side session record, as returned by `get_session_by_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The session identifier.
    pub session_id: String,

    /// The session title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// When the session was created.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,

    /// The exchanges recorded for this session.
    #[serde(default)]
    pub exchanges: Vec<ExchangeRecord>,
}

impl SessionRecord {
    /// Hydrate a client-side [`Chat`] from this session record.
    ///
    /// Exchanges are paired into user/assistant messages in timestamp order.
    /// An exchange without a completed response contributes only its user
    /// message.
    pub fn into_chat(mut self, chat_id: impl Into<String>) -> Chat {
        self.exchanges.sort_by_key(|e| e.created_at);
        let mut chat = Chat::new(chat_id);
        if let Some(title) = self.title {
            chat.title = title;
        }
        if let Some(created_at) = self.created_at {
            chat.created_at = created_at;
        }
        for exchange in self.exchanges {
            let mut user = Message::new(MessageRole::User, exchange.user_input)
                .with_exchange_id(exchange.exchange_id.clone())
                .with_timestamp(exchange.created_at);
            user.has_whiteboard = exchange.has_whiteboard;
            chat.push_message(user);
            if let Some(response) = exchange.assistant_response {
                let mut assistant = Message::new(MessageRole::Assistant, response)
                    .with_exchange_id(exchange.exchange_id)
                    .with_timestamp(exchange.created_at);
                assistant.is_bookmarked = exchange.is_bookmarked;
                chat.push_message(assistant);
            }
        }
        chat.session_id = Some(self.session_id);
        chat
    }
}

/// A session summary row, as returned by `get_sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session identifier.
    pub session_id: String,

    /// The session title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// When the session was created.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl From<&Chat> for SessionSummary {
    fn from(chat: &Chat) -> Self {
        Self {
            session_id: chat.session_id.clone().unwrap_or_else(|| chat.id.clone()),
            title: Some(chat.title.clone()),
            created_at: Some(chat.created_at),
        }
    }
}

/// Parameters for registering a session server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInitParams {
    /// The client-chosen session identifier.
    pub session_id: String,

    /// The session title.
    pub title: String,

    /// Whether this is a brand-new session.
    pub new_session: bool,
}

impl SessionInitParams {
    /// Registration parameters for a new session.
    pub fn new_session(session_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            title: title.into(),
            new_session: true,
        }
    }
}

/// A message as sent on the wire to `create_chat_stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// The role of the message author.
    pub role: MessageRole,

    /// The text content.
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// The request body for `create_chat_stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// The conversation so far, ending with the user message to answer.
    pub messages: Vec<WireMessage>,

    /// The session to stream under.
    pub session_id: String,

    /// Whether the session has not been registered server-side yet.
    pub new_session: bool,

    /// The session title, used when the server registers a new session.
    pub session_title: String,

    /// Whether the final user message carries whiteboard content.
    pub has_whiteboard: bool,

    /// Screenshots captured from the whiteboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whiteboard_screenshots: Option<Vec<String>>,

    /// Serialized whiteboard state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whiteboard_state: Option<serde_json::Value>,
}

impl StreamRequest {
    /// Build a stream request from a chat whose last message is the user
    /// input to answer.
    pub fn from_chat(chat: &Chat) -> Self {
        let last = chat.messages.last();
        Self {
            messages: chat.messages.iter().map(WireMessage::from).collect(),
            session_id: chat.session_id.clone().unwrap_or_else(|| chat.id.clone()),
            new_session: chat.session_id.is_none(),
            session_title: chat.title.clone(),
            has_whiteboard: last.map(|m| m.has_whiteboard).unwrap_or(false),
            whiteboard_screenshots: last.and_then(|m| m.whiteboard_screenshots.clone()),
            whiteboard_state: last.and_then(|m| m.whiteboard_state.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn exchange(
        id: &str,
        input: &str,
        response: Option<&str>,
        created_at: OffsetDateTime,
    ) -> ExchangeRecord {
        ExchangeRecord {
            exchange_id: id.to_string(),
            user_input: input.to_string(),
            assistant_response: response.map(String::from),
            created_at,
            is_bookmarked: false,
            has_whiteboard: false,
        }
    }

    #[test]
    fn hydration_pairs_exchanges_in_timestamp_order() {
        let record = SessionRecord {
            session_id: "s-1".to_string(),
            title: Some("Algebra".to_string()),
            created_at: None,
            exchanges: vec![
                exchange(
                    "ex-2",
                    "and x^3?",
                    Some("x^3 grows faster"),
                    datetime!(2024-01-01 10:05 UTC),
                ),
                exchange(
                    "ex-1",
                    "what is x^2?",
                    Some("x squared"),
                    datetime!(2024-01-01 10:00 UTC),
                ),
            ],
        };

        let chat = record.into_chat("chat-1");
        assert_eq!(chat.title, "Algebra");
        assert_eq!(chat.session_id.as_deref(), Some("s-1"));
        assert_eq!(chat.messages.len(), 4);
        assert_eq!(chat.messages[0].content, "what is x^2?");
        assert_eq!(chat.messages[1].content, "x squared");
        assert_eq!(chat.messages[2].content, "and x^3?");
        assert_eq!(chat.messages[3].exchange_id.as_deref(), Some("ex-2"));
    }

    #[test]
    fn incomplete_exchange_contributes_only_user_message() {
        let record = SessionRecord {
            session_id: "s-1".to_string(),
            title: None,
            created_at: None,
            exchanges: vec![exchange(
                "ex-1",
                "unanswered",
                None,
                datetime!(2024-01-01 10:00 UTC),
            )],
        };

        let chat = record.into_chat("chat-1");
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, MessageRole::User);
    }

    #[test]
    fn stream_request_marks_new_sessions() {
        let mut chat = Chat::new("chat-1");
        chat.push_message(Message::user("bonjour"));
        let request = StreamRequest::from_chat(&chat);
        assert!(request.new_session);
        assert_eq!(request.session_id, "chat-1");
        assert_eq!(request.messages.len(), 1);

        chat.session_id = Some("s-42".to_string());
        let request = StreamRequest::from_chat(&chat);
        assert!(!request.new_session);
        assert_eq!(request.session_id, "s-42");
    }

    #[test]
    fn stream_request_carries_whiteboard_from_last_message() {
        let mut chat = Chat::new("chat-1");
        chat.push_message(Message::user("look").with_whiteboard(
            Some(vec!["shot-1".to_string()]),
            Some(serde_json::json!({"strokes": []})),
        ));
        let request = StreamRequest::from_chat(&chat);
        assert!(request.has_whiteboard);
        assert_eq!(
            request.whiteboard_screenshots,
            Some(vec!["shot-1".to_string()])
        );
    }
}
