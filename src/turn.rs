//! Driving one exchange: stream consumption and finalization.
//!
//! A turn takes the chat's pending user message, opens a streaming response,
//! accumulates content deltas, and finalizes exactly once. Completion has
//! three equivalent triggers: the explicit `done` frame, natural end of
//! stream, and the safety deadline. All three resolve the same cancellable
//! timeout wrapped around the drain loop, so double finalization cannot
//! happen. Nothing in this path is fatal: the worst outcome is a reply that
//! only survives locally.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;

use crate::api::ChatApi;
use crate::events::{ChatEvent, EventBus};
use crate::fallback::FallbackResponder;
use crate::observability;
use crate::store::ChatCache;
use crate::types::{Chat, Message, MessageRole, StreamEvent, StreamRequest};

/// User input submitted for one exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInput {
    /// The text of the question.
    pub text: String,

    /// Whether whiteboard content is attached.
    pub has_whiteboard: bool,

    /// Screenshots captured from the whiteboard.
    pub whiteboard_screenshots: Option<Vec<String>>,

    /// Serialized whiteboard state.
    pub whiteboard_state: Option<serde_json::Value>,
}

impl UserInput {
    /// Plain text input.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches whiteboard content.
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

/// Where the turn's reply came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TurnOrigin {
    /// The reply was streamed from the backend.
    Streamed,

    /// The reply came from the offline fallback responder.
    Fallback,

    /// The stream completed with no content; nothing was appended.
    Empty,
}

/// The result of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The appended assistant message, if any.
    pub message: Option<Message>,

    /// Where the reply came from.
    pub origin: TurnOrigin,

    /// Whether completion was acknowledged by the remote API.
    pub persisted_remotely: bool,

    /// A non-blocking warning for the user, if remote persistence failed.
    pub warning: Option<String>,
}

/// How the drain loop ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DrainEnd {
    /// `done` frame or natural end of stream.
    Completed,

    /// The stream produced an error item.
    Failed,

    /// The safety deadline expired.
    DeadlineExpired,
}

/// Warning surfaced when the completion signal fails twice. Rendered by the
/// host as a toast; kept as an i18n key.
const SAVE_WARNING: &str = "responseNotSavedRemotely";

/// Drives exchanges against the chat API, with fallback when offline.
pub struct TurnRunner {
    api: Option<Arc<dyn ChatApi>>,
    cache: Arc<dyn ChatCache>,
    events: EventBus,
    fallback: FallbackResponder,
    stream_deadline: Duration,
    complete_retry_delay: Duration,
}

impl TurnRunner {
    /// Create a turn runner. `api` is `None` when unauthenticated.
    pub fn new(
        api: Option<Arc<dyn ChatApi>>,
        cache: Arc<dyn ChatCache>,
        events: EventBus,
        fallback: FallbackResponder,
        stream_deadline: Duration,
        complete_retry_delay: Duration,
    ) -> Self {
        Self {
            api,
            cache,
            events,
            fallback,
            stream_deadline,
            complete_retry_delay,
        }
    }

    /// Submit a new user message and drive the exchange to completion.
    ///
    /// Errors never propagate; they degrade to partial finalization or a
    /// fallback reply.
    pub async fn send(&self, chat: &mut Chat, input: UserInput) -> TurnOutcome {
        let mut message = Message::user(input.text);
        if input.has_whiteboard {
            message =
                message.with_whiteboard(input.whiteboard_screenshots, input.whiteboard_state);
        }
        chat.push_message(message);
        self.persist(chat);
        self.run_exchange(chat).await
    }

    /// Edit an earlier user message, truncate everything after it, and
    /// resubmit.
    ///
    /// Returns `None` if no message with the given id exists.
    pub async fn resend(
        &self,
        chat: &mut Chat,
        message_id: &str,
        content: impl Into<String>,
    ) -> Option<TurnOutcome> {
        if !chat.edit_and_truncate(message_id, content) {
            return None;
        }
        self.persist(chat);
        Some(self.run_exchange(chat).await)
    }

    /// Drive an exchange for a user message already present in the chat.
    ///
    /// Used when resolution seeded the chat with an initial prompt. If the
    /// chat does not end with a user message there is nothing to answer.
    pub async fn run_seeded(&self, chat: &mut Chat) -> TurnOutcome {
        let pending = chat
            .messages
            .last()
            .is_some_and(|m| m.role == MessageRole::User);
        if !pending {
            return TurnOutcome {
                message: None,
                origin: TurnOrigin::Empty,
                persisted_remotely: false,
                warning: None,
            };
        }
        self.run_exchange(chat).await
    }

    async fn run_exchange(&self, chat: &mut Chat) -> TurnOutcome {
        let Some(api) = self.api.clone() else {
            return self.fallback_turn(chat).await;
        };

        let request = StreamRequest::from_chat(chat);
        let stream = match api.create_chat_stream(request).await {
            Ok(stream) => stream,
            Err(_) => {
                observability::STREAM_ERRORS.click();
                return self.fallback_turn(chat).await;
            }
        };

        // Metadata arrives in headers, before any body bytes
        if chat.session_id.is_none()
            && let Some(session_id) = stream.session_id.clone()
        {
            chat.session_id = Some(session_id);
        }
        let exchange_id = stream.exchange_id.clone();
        if let Some(exchange_id) = &exchange_id
            && let Some(last) = chat.messages.last_mut()
            && last.role == MessageRole::User
        {
            last.exchange_id = Some(exchange_id.clone());
        }

        let (buffer, ended) = self.drain(stream.events, &chat.id).await;

        match ended {
            DrainEnd::Completed => self.finalize(chat, buffer, exchange_id).await,
            DrainEnd::DeadlineExpired | DrainEnd::Failed if !buffer.is_empty() => {
                self.finalize(chat, buffer, exchange_id).await
            }
            DrainEnd::DeadlineExpired | DrainEnd::Failed => self.fallback_turn(chat).await,
        }
    }

    /// Accumulate deltas until completion, error, or the safety deadline.
    ///
    /// The deadline is a single timeout racing the whole drain loop; whichever
    /// resolves first cancels the other.
    async fn drain(
        &self,
        mut events: std::pin::Pin<
            Box<dyn futures::Stream<Item = crate::error::Result<StreamEvent>> + Send>,
        >,
        chat_id: &str,
    ) -> (String, DrainEnd) {
        let start = Instant::now();
        let mut buffer = String::new();
        let mut ended = DrainEnd::DeadlineExpired;
        {
            let drain = async {
                loop {
                    match events.next().await {
                        Some(Ok(StreamEvent::Delta(text))) => {
                            observability::STREAM_DELTAS.click();
                            buffer.push_str(&text);
                            self.events.publish(ChatEvent::Delta {
                                chat_id: chat_id.to_string(),
                                text,
                            });
                        }
                        Some(Ok(StreamEvent::Done)) => break DrainEnd::Completed,
                        Some(Err(_)) => {
                            observability::STREAM_ERRORS.click();
                            break DrainEnd::Failed;
                        }
                        // Natural end without a done frame counts as completion
                        None => break DrainEnd::Completed,
                    }
                }
            };
            match tokio::time::timeout(self.stream_deadline, drain).await {
                Ok(end) => ended = end,
                Err(_) => observability::STREAM_DEADLINE.click(),
            }
        }
        observability::STREAM_DURATION.add(start.elapsed().as_secs_f64());
        (buffer, ended)
    }

    /// Append the completed assistant message, persist, and signal the remote
    /// API.
    async fn finalize(
        &self,
        chat: &mut Chat,
        buffer: String,
        exchange_id: Option<String>,
    ) -> TurnOutcome {
        let text = buffer.trim();
        if text.is_empty() {
            observability::FINALIZE_DROPPED_EMPTY.click();
            return TurnOutcome {
                message: None,
                origin: TurnOrigin::Empty,
                persisted_remotely: false,
                warning: None,
            };
        }

        let has_whiteboard = chat
            .last_user_message()
            .map(|m| m.has_whiteboard)
            .unwrap_or(false);

        let mut message = Message::assistant(text);
        if let Some(exchange_id) = &exchange_id {
            message = message.with_exchange_id(exchange_id.clone());
        }
        chat.push_message(message.clone());
        self.persist(chat);
        observability::FINALIZE_APPENDS.click();
        self.events.publish(ChatEvent::Finalized {
            chat_id: chat.id.clone(),
            message: message.clone(),
        });

        let mut persisted_remotely = false;
        let mut warning = None;
        match (&self.api, &exchange_id) {
            (Some(api), Some(exchange_id)) => {
                match self
                    .signal_completion(api.as_ref(), exchange_id, text, has_whiteboard)
                    .await
                {
                    Ok(()) => persisted_remotely = true,
                    Err(_) => {
                        warning = Some(SAVE_WARNING.to_string());
                        self.events.publish(ChatEvent::Warning {
                            chat_id: chat.id.clone(),
                            message: SAVE_WARNING.to_string(),
                        });
                    }
                }
            }
            _ => observability::FINALIZE_UNSIGNALED.click(),
        }

        TurnOutcome {
            message: Some(message),
            origin: TurnOrigin::Streamed,
            persisted_remotely,
            warning,
        }
    }

    /// Signal exchange completion, retrying exactly once after a fixed delay.
    async fn signal_completion(
        &self,
        api: &dyn ChatApi,
        exchange_id: &str,
        text: &str,
        has_whiteboard: bool,
    ) -> crate::error::Result<()> {
        if api
            .complete_exchange(exchange_id, text, has_whiteboard)
            .await
            .is_ok()
        {
            return Ok(());
        }
        observability::COMPLETE_RETRIES.click();
        tokio::time::sleep(self.complete_retry_delay).await;
        api.complete_exchange(exchange_id, text, has_whiteboard)
            .await
            .map_err(|e| {
                observability::COMPLETE_FAILURES.click();
                e
            })
    }

    /// Answer with a canned reply, through the same mutation path.
    async fn fallback_turn(&self, chat: &mut Chat) -> TurnOutcome {
        let (input, has_whiteboard) = chat
            .last_user_message()
            .map(|m| (m.content.clone(), m.has_whiteboard))
            .unwrap_or_default();
        let message = self.fallback.respond(&input, has_whiteboard).await;
        chat.push_message(message.clone());
        self.persist(chat);
        self.events.publish(ChatEvent::Finalized {
            chat_id: chat.id.clone(),
            message: message.clone(),
        });
        TurnOutcome {
            message: Some(message),
            origin: TurnOrigin::Fallback,
            persisted_remotely: false,
            warning: None,
        }
    }

    fn persist(&self, chat: &Chat) {
        if self.cache.upsert(chat).is_err() {
            observability::CACHE_WRITE_ERRORS.click();
        }
    }
}
