use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Message, MessageRole};

/// Default title given to a freshly created chat. The host UI treats this as
/// an i18n key and renders it localized.
pub const DEFAULT_CHAT_TITLE: &str = "newChat";

/// A client-owned chat conversation.
///
/// A chat is mirrored to a remote session record when the user is
/// authenticated; `session_id` links the two. Messages are append-only in
/// normal flow; an edit truncates the history back to the edited message and
/// resubmits from there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Client-assigned chat identifier, also used as the remote session id.
    pub id: String,

    /// Display title.
    pub title: String,

    /// When the chat was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Ordered message history.
    pub messages: Vec<Message>,

    /// Remote session identifier, once the chat has been registered
    /// server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Chat {
    /// Create a new, empty chat with the default title.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            created_at: OffsetDateTime::now_utc(),
            messages: Vec::new(),
            session_id: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Appends a message to the history.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the message with the given id, if present.
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    /// Rewrites the content of the message with the given id and truncates
    /// everything after it, so the exchange can be resubmitted.
    ///
    /// Returns false if no message with that id exists; the chat is unchanged
    /// in that case.
    pub fn edit_and_truncate(&mut self, message_id: &str, content: impl Into<String>) -> bool {
        let Some(index) = self.messages.iter().position(|m| m.id == message_id) else {
            return false;
        };
        self.messages[index].content = content.into();
        self.messages[index].exchange_id = None;
        self.messages.truncate(index + 1);
        true
    }

    /// Flips the bookmark flag on the message with the given id.
    ///
    /// Returns the new bookmark state and the message's exchange id so the
    /// caller can mirror the flip to the server.
    pub fn toggle_bookmark(&mut self, message_id: &str) -> Option<(bool, Option<String>)> {
        let message = self.messages.iter_mut().find(|m| m.id == message_id)?;
        message.is_bookmarked = !message.is_bookmarked;
        Some((message.is_bookmarked, message.exchange_id.clone()))
    }

    /// Returns the most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }

    /// Returns true if the chat has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chat_is_blank() {
        let chat = Chat::new("chat-1");
        assert_eq!(chat.id, "chat-1");
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert!(chat.messages.is_empty());
        assert!(chat.session_id.is_none());
    }

    #[test]
    fn messages_append_in_order() {
        let mut chat = Chat::new("chat-1");
        chat.push_message(Message::user("one"));
        chat.push_message(Message::assistant("two"));
        chat.push_message(Message::user("three"));
        let contents: Vec<&str> = chat.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn edit_truncates_to_edited_index() {
        let mut chat = Chat::new("chat-1");
        let first = Message::user("first question");
        let first_id = first.id.clone();
        chat.push_message(first);
        chat.push_message(Message::assistant("first answer").with_exchange_id("ex-1"));
        chat.push_message(Message::user("second question"));
        chat.push_message(Message::assistant("second answer").with_exchange_id("ex-2"));

        assert!(chat.edit_and_truncate(&first_id, "revised question"));
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, "revised question");
        assert!(chat.messages[0].exchange_id.is_none());
    }

    #[test]
    fn edit_unknown_id_is_a_noop() {
        let mut chat = Chat::new("chat-1");
        chat.push_message(Message::user("hello"));
        assert!(!chat.edit_and_truncate("missing", "rewritten"));
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, "hello");
    }

    #[test]
    fn toggle_bookmark_flips_and_reports_exchange() {
        let mut chat = Chat::new("chat-1");
        let message = Message::assistant("answer").with_exchange_id("ex-9");
        let message_id = message.id.clone();
        chat.push_message(message);

        let (state, exchange_id) = chat.toggle_bookmark(&message_id).unwrap();
        assert!(state);
        assert_eq!(exchange_id.as_deref(), Some("ex-9"));

        let (state, _) = chat.toggle_bookmark(&message_id).unwrap();
        assert!(!state);
    }

    #[test]
    fn chat_round_trip_preserves_order() {
        let mut chat = Chat::new("chat-1").with_title("Fractions");
        chat.push_message(Message::user("what is 1/2 + 1/3?"));
        chat.push_message(Message::assistant("5/6").with_exchange_id("ex-1"));

        let json = serde_json::to_string(&chat).unwrap();
        let parsed: Chat = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, chat.id);
        assert_eq!(parsed.title, chat.title);
        assert_eq!(parsed.messages, chat.messages);
    }
}
