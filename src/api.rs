//! The chat API abstraction.
//!
//! The [`ChatApi`] trait is the seam between the session/turn machinery and
//! the HTTP backend. Production code uses the reqwest-backed
//! [`TutorClient`](crate::client::TutorClient); tests substitute mocks.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::types::{SessionInitParams, SessionRecord, SessionSummary, StreamEvent, StreamRequest};

/// An open chat stream, with the response metadata extracted before the body
/// is consumed.
pub struct ChatStream {
    /// Server-assigned session id, present when the server registered a new
    /// session for this request.
    pub session_id: Option<String>,

    /// Server-assigned exchange id for this user-input/response pair. Absent
    /// means finalization completes without remote signaling.
    pub exchange_id: Option<String>,

    /// The parsed event stream.
    pub events: Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>,
}

impl ChatStream {
    /// Create a chat stream from metadata and an event stream.
    pub fn new<S>(session_id: Option<String>, exchange_id: Option<String>, events: S) -> Self
    where
        S: Stream<Item = Result<StreamEvent>> + Send + 'static,
    {
        Self {
            session_id,
            exchange_id,
            events: Box::pin(events),
        }
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("session_id", &self.session_id)
            .field("exchange_id", &self.exchange_id)
            .finish_non_exhaustive()
    }
}

/// Operations offered by the tutor chat backend.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch a full session record by id.
    async fn get_session_by_id(&self, session_id: &str) -> Result<SessionRecord>;

    /// Register a session server-side.
    async fn initialize_session(&self, params: SessionInitParams) -> Result<()>;

    /// Open a streaming response for the chat's pending user message.
    async fn create_chat_stream(&self, request: StreamRequest) -> Result<ChatStream>;

    /// Signal completion of an exchange with the final response text.
    async fn complete_exchange(
        &self,
        exchange_id: &str,
        text: &str,
        has_whiteboard: bool,
    ) -> Result<()>;

    /// Set or clear the bookmark flag on an exchange.
    async fn bookmark_exchange(&self, exchange_id: &str, bookmarked: bool) -> Result<()>;

    /// Delete a session and its exchanges.
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Mark a session as ended without deleting it.
    async fn end_session(&self, session_id: &str) -> Result<()>;

    /// List the caller's sessions.
    async fn get_sessions(&self) -> Result<Vec<SessionSummary>>;
}
