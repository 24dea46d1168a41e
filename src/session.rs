//! High-level tutor chat session facade.
//!
//! [`TutorSession`] wires the resolver, the turn runner, the cache, and the
//! event bus together behind one handle. Hosts resolve a chat, drive
//! exchanges on it, and manage the surrounding session lifecycle without
//! touching the individual pieces.

use std::sync::Arc;

use crate::api::ChatApi;
use crate::client::TutorClient;
use crate::config::ChatConfig;
use crate::error::Result;
use crate::events::{ChatEvent, EventBus};
use crate::fallback::FallbackResponder;
use crate::observability;
use crate::resolver::SessionResolver;
use crate::store::{ChatCache, EphemeralFlags, FileCache};
use crate::turn::{TurnOutcome, TurnRunner, UserInput};
use crate::types::{Chat, SessionSummary};

/// A handle on the tutor chat flow.
pub struct TutorSession {
    api: Option<Arc<dyn ChatApi>>,
    cache: Arc<dyn ChatCache>,
    flags: Arc<EphemeralFlags>,
    events: EventBus,
    resolver: SessionResolver,
    runner: TurnRunner,
}

impl TutorSession {
    /// Create a session from configuration.
    ///
    /// If no auth token is configured or present in the environment, the
    /// session runs unauthenticated: chats resolve from the local cache and
    /// replies come from the fallback responder.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api: Option<Arc<dyn ChatApi>> =
            match TutorClient::with_options(config.auth_token.clone(), config.base_url.clone(), None)
            {
                Ok(client) => Some(Arc::new(client)),
                Err(err) if matches!(err, crate::error::Error::Authentication { .. }) => None,
                Err(err) => return Err(err),
            };
        let cache_path = config
            .cache_path
            .clone()
            .unwrap_or_else(FileCache::default_path);
        let cache: Arc<dyn ChatCache> = Arc::new(FileCache::new(cache_path));
        Ok(Self::from_parts(api, cache, config))
    }

    /// Assemble a session from explicit parts.
    pub fn from_parts(
        api: Option<Arc<dyn ChatApi>>,
        cache: Arc<dyn ChatCache>,
        config: &ChatConfig,
    ) -> Self {
        let flags = Arc::new(EphemeralFlags::new());
        let events = EventBus::new();
        let resolver = SessionResolver::new(
            api.clone(),
            cache.clone(),
            flags.clone(),
            config.resolve_deadline,
        );
        let runner = TurnRunner::new(
            api.clone(),
            cache.clone(),
            events.clone(),
            FallbackResponder::new(config.fallback_delay),
            config.stream_deadline,
            config.complete_retry_delay,
        );
        Self {
            api,
            cache,
            flags,
            events,
            resolver,
            runner,
        }
    }

    /// Whether the session has an authenticated API behind it.
    pub fn is_authenticated(&self) -> bool {
        self.api.is_some()
    }

    /// Subscribe to chat events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Resolve a chat by id.
    pub async fn open(&self, chat_id: &str) -> Chat {
        self.resolver.resolve(chat_id).await
    }

    /// Resolve a deliberately blank chat, skipping remote and cached state.
    pub async fn open_blank(&self, chat_id: &str) -> Chat {
        self.flags.mark_blank(chat_id);
        self.resolver.resolve(chat_id).await
    }

    /// Resolve a chat seeded with an initial prompt and answer it
    /// immediately.
    pub async fn open_with_prompt(&self, chat_id: &str, prompt: &str) -> (Chat, TurnOutcome) {
        self.flags.set_initial_prompt(chat_id, prompt);
        let mut chat = self.resolver.resolve(chat_id).await;
        let outcome = self.runner.run_seeded(&mut chat).await;
        (chat, outcome)
    }

    /// Submit a user message and drive the exchange to completion.
    pub async fn send(&self, chat: &mut Chat, input: UserInput) -> TurnOutcome {
        self.runner.send(chat, input).await
    }

    /// Edit an earlier user message, drop everything after it, and resubmit.
    ///
    /// Returns `None` if the message id does not exist in the chat.
    pub async fn resend(
        &self,
        chat: &mut Chat,
        message_id: &str,
        content: impl Into<String>,
    ) -> Option<TurnOutcome> {
        self.runner.resend(chat, message_id, content).await
    }

    /// Toggle the bookmark on a message.
    ///
    /// The new state is persisted locally first; if the message carries an
    /// exchange id and the session is authenticated, the change is mirrored
    /// to the backend on a best-effort basis. Returns the new bookmark state,
    /// or `None` if the message does not exist.
    pub async fn toggle_bookmark(&self, chat: &mut Chat, message_id: &str) -> Option<bool> {
        let (bookmarked, exchange_id) = chat.toggle_bookmark(message_id)?;
        if self.cache.upsert(chat).is_err() {
            observability::CACHE_WRITE_ERRORS.click();
        }
        if let (Some(api), Some(exchange_id)) = (&self.api, exchange_id)
            && api.bookmark_exchange(&exchange_id, bookmarked).await.is_err()
        {
            observability::CLIENT_REQUEST_ERRORS.click();
        }
        Some(bookmarked)
    }

    /// Announce shared whiteboard content to subscribers.
    pub fn share_whiteboard(&self, chat_id: &str, screenshot: impl Into<String>) {
        self.events.publish(ChatEvent::WhiteboardShared {
            chat_id: chat_id.to_string(),
            screenshot: screenshot.into(),
        });
    }

    /// Delete a chat locally and, when authenticated, its remote session.
    ///
    /// The local removal is authoritative; a remote failure is tolerated.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.cache.remove(chat_id)?;
        if let Some(api) = &self.api
            && api.delete_session(chat_id).await.is_err()
        {
            observability::CLIENT_REQUEST_ERRORS.click();
        }
        Ok(())
    }

    /// Mark the chat's remote session as ended.
    pub async fn end_session(&self, chat: &Chat) -> Result<()> {
        if let (Some(api), Some(session_id)) = (&self.api, &chat.session_id) {
            api.end_session(session_id).await?;
        }
        Ok(())
    }

    /// List known sessions.
    ///
    /// Authenticated sessions come from the backend; otherwise summaries are
    /// derived from the local cache.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        if let Some(api) = &self.api {
            return api.get_sessions().await;
        }
        let chats = self.cache.load()?;
        Ok(chats.iter().map(SessionSummary::from).collect())
    }
}
