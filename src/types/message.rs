use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Role type for a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,

    /// System role.
    System,
}

/// A single message in a chat.
///
/// Messages are immutable once finalized, with the exception of bookmark
/// toggling. Assistant messages produced by a completed exchange carry the
/// server-assigned `exchange_id`; fallback replies carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Client-assigned unique identifier.
    pub id: String,

    /// The role of the message author.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,

    /// When the message was created.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,

    /// Server-assigned exchange identifier, if this message belongs to a
    /// remote exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<String>,

    /// Whether the user bookmarked the exchange this message belongs to.
    #[serde(default)]
    pub is_bookmarked: bool,

    /// Whether whiteboard content was attached to this message.
    #[serde(default)]
    pub has_whiteboard: bool,

    /// Screenshots captured from the whiteboard, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whiteboard_screenshots: Option<Vec<String>>,

    /// Serialized whiteboard state, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whiteboard_state: Option<serde_json::Value>,
}

impl Message {
    /// Create a new message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
            exchange_id: None,
            is_bookmarked: false,
            has_whiteboard: false,
            whiteboard_screenshots: None,
            whiteboard_state: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Sets the exchange id.
    pub fn with_exchange_id(mut self, exchange_id: impl Into<String>) -> Self {
        self.exchange_id = Some(exchange_id.into());
        self
    }

    /// Sets the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Marks the message as carrying whiteboard content.
    pub fn with_whiteboard(
        mut self,
        screenshots: Option<Vec<String>>,
        state: Option<serde_json::Value>,
    ) -> Self {
        self.has_whiteboard = true;
        self.whiteboard_screenshots = screenshots;
        self.whiteboard_state = state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::System).unwrap(),
            "\"system\""
        );
    }

    #[test]
    fn message_round_trip() {
        let message = Message::assistant("Bonjour").with_exchange_id("ex-1");
        let json = serde_json::to_string(&message).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn optional_fields_default_on_deserialize() {
        let json = r#"{
            "id": "m-1",
            "role": "user",
            "content": "hello",
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.exchange_id.is_none());
        assert!(!message.is_bookmarked);
        assert!(!message.has_whiteboard);
        assert!(message.whiteboard_screenshots.is_none());
    }

    #[test]
    fn whiteboard_builder_sets_flag() {
        let message = Message::user("look at this").with_whiteboard(
            Some(vec!["data:image/png;base64,...".to_string()]),
            None,
        );
        assert!(message.has_whiteboard);
        assert_eq!(
            message.whiteboard_screenshots.as_ref().map(Vec::len),
            Some(1)
        );
    }
}
