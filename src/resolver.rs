//! Session resolution.
//!
//! Given a chat id, the resolver decides where the chat comes from: a
//! deliberately blank chat, the remote session record, or the local cache.
//! Resolution never fails and never blocks past its deadline; the worst case
//! is an empty chat.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::ChatApi;
use crate::observability;
use crate::store::{ChatCache, EphemeralFlags};
use crate::types::{Chat, Message, SessionInitParams};

/// Resolves chat ids to [`Chat`] values.
///
/// Origin priority: blank flag, then remote session fetch (authenticated
/// only), then local cache, then synthesis. Every resolved chat is written
/// through to the cache.
pub struct SessionResolver {
    api: Option<Arc<dyn ChatApi>>,
    cache: Arc<dyn ChatCache>,
    flags: Arc<EphemeralFlags>,
    deadline: Duration,
}

impl SessionResolver {
    /// Create a resolver. `api` is `None` when unauthenticated.
    pub fn new(
        api: Option<Arc<dyn ChatApi>>,
        cache: Arc<dyn ChatCache>,
        flags: Arc<EphemeralFlags>,
        deadline: Duration,
    ) -> Self {
        Self {
            api,
            cache,
            flags,
            deadline,
        }
    }

    /// Resolve a chat id to a chat.
    ///
    /// Always yields a chat: if resolution has not converged within the
    /// deadline, an empty chat is created so the host never shows an
    /// indefinite loading state.
    pub async fn resolve(&self, chat_id: &str) -> Chat {
        let start = Instant::now();
        let resolved = tokio::time::timeout(self.deadline, self.resolve_inner(chat_id)).await;
        observability::RESOLVE_DURATION.add(start.elapsed().as_secs_f64());
        match resolved {
            Ok(chat) => chat,
            Err(_) => {
                observability::RESOLVE_DEADLINE.click();
                let chat = Chat::new(chat_id);
                self.persist(&chat);
                chat
            }
        }
    }

    async fn resolve_inner(&self, chat_id: &str) -> Chat {
        // Origin (a): the host flagged this id as a deliberately blank chat
        if self.flags.take_blank(chat_id) {
            observability::RESOLVE_BLANK.click();
            let mut chat = Chat::new(chat_id);
            if let Some(api) = &self.api {
                let params = SessionInitParams::new_session(chat_id, &chat.title);
                match api.initialize_session(params).await {
                    Ok(()) => chat.session_id = Some(chat_id.to_string()),
                    Err(_) => observability::CLIENT_REQUEST_ERRORS.click(),
                }
            }
            self.persist(&chat);
            return chat;
        }

        // Origin (b): hydrate from the remote session record
        let mut registered = false;
        if let Some(api) = &self.api {
            match api.get_session_by_id(chat_id).await {
                Ok(record) => {
                    observability::RESOLVE_REMOTE.click();
                    let chat = record.into_chat(chat_id);
                    self.persist(&chat);
                    return chat;
                }
                Err(err) if err.is_not_found() => {
                    // Unknown server-side: register the id as a new session
                    // instead of failing
                    let params =
                        SessionInitParams::new_session(chat_id, crate::types::DEFAULT_CHAT_TITLE);
                    match api.initialize_session(params).await {
                        Ok(()) => registered = true,
                        Err(_) => observability::CLIENT_REQUEST_ERRORS.click(),
                    }
                }
                Err(_) => observability::CLIENT_REQUEST_ERRORS.click(),
            }
        }

        // Origin (c): local cache, else synthesize
        observability::RESOLVE_LOCAL.click();
        let cached = match self.cache.get(chat_id) {
            Ok(cached) => cached,
            Err(_) => {
                observability::CACHE_READ_ERRORS.click();
                None
            }
        };
        let mut chat = cached.unwrap_or_else(|| Chat::new(chat_id));
        if registered && chat.session_id.is_none() {
            chat.session_id = Some(chat_id.to_string());
        }
        if let Some(prompt) = self.flags.take_initial_prompt(chat_id) {
            chat.push_message(Message::user(prompt));
        }
        self.persist(&chat);
        chat
    }

    fn persist(&self, chat: &Chat) {
        if self.cache.upsert(chat).is_err() {
            observability::CACHE_WRITE_ERRORS.click();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatStream;
    use crate::error::{Error, Result};
    use crate::store::MemoryCache;
    use crate::types::{
        ExchangeRecord, SessionRecord, SessionSummary, StreamRequest, DEFAULT_CHAT_TITLE,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time::macros::datetime;

    /// Scripted API: serves canned session records and logs registrations.
    #[derive(Default)]
    struct MockApi {
        sessions: Mutex<HashMap<String, SessionRecord>>,
        initialized: Mutex<Vec<SessionInitParams>>,
        hang_forever: bool,
    }

    impl MockApi {
        fn with_session(record: SessionRecord) -> Self {
            let api = Self::default();
            api.sessions
                .lock()
                .unwrap()
                .insert(record.session_id.clone(), record);
            api
        }
    }

    #[async_trait::async_trait]
    impl ChatApi for MockApi {
        async fn get_session_by_id(&self, session_id: &str) -> Result<SessionRecord> {
            if self.hang_forever {
                std::future::pending::<()>().await;
            }
            self.sessions
                .lock()
                .unwrap()
                .get(session_id)
                .cloned()
                .ok_or_else(|| {
                    Error::not_found(
                        "session does not exist",
                        Some("session".to_string()),
                        Some(session_id.to_string()),
                    )
                })
        }

        async fn initialize_session(&self, params: SessionInitParams) -> Result<()> {
            self.initialized.lock().unwrap().push(params);
            Ok(())
        }

        async fn create_chat_stream(&self, _request: StreamRequest) -> Result<ChatStream> {
            Err(Error::unknown("not scripted"))
        }

        async fn complete_exchange(&self, _: &str, _: &str, _: bool) -> Result<()> {
            Ok(())
        }

        async fn bookmark_exchange(&self, _: &str, _: bool) -> Result<()> {
            Ok(())
        }

        async fn delete_session(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn end_session(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn get_sessions(&self) -> Result<Vec<SessionSummary>> {
            Ok(Vec::new())
        }
    }

    fn resolver(api: Option<Arc<dyn ChatApi>>, flags: Arc<EphemeralFlags>) -> SessionResolver {
        SessionResolver::new(
            api,
            Arc::new(MemoryCache::new()),
            flags,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn blank_flag_yields_empty_chat_with_default_title() {
        let flags = Arc::new(EphemeralFlags::new());
        flags.mark_blank("X");
        let api = Arc::new(MockApi::default());
        let resolver = resolver(Some(api.clone()), flags);

        let chat = resolver.resolve("X").await;
        assert!(chat.messages.is_empty());
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert_eq!(chat.session_id.as_deref(), Some("X"));
        // registered server-side
        let initialized = api.initialized.lock().unwrap();
        assert_eq!(initialized.len(), 1);
        assert!(initialized[0].new_session);
    }

    #[tokio::test]
    async fn remote_record_hydrates_paired_messages() {
        let record = SessionRecord {
            session_id: "chat-1".to_string(),
            title: Some("Fractions".to_string()),
            created_at: None,
            exchanges: vec![ExchangeRecord {
                exchange_id: "ex-1".to_string(),
                user_input: "1/2 + 1/3 ?".to_string(),
                assistant_response: Some("5/6".to_string()),
                created_at: datetime!(2024-01-01 10:00 UTC),
                is_bookmarked: false,
                has_whiteboard: false,
            }],
        };
        let api = Arc::new(MockApi::with_session(record));
        let flags = Arc::new(EphemeralFlags::new());
        let cache: Arc<dyn ChatCache> = Arc::new(MemoryCache::new());
        let resolver =
            SessionResolver::new(Some(api), cache.clone(), flags, Duration::from_secs(5));

        let chat = resolver.resolve("chat-1").await;
        assert_eq!(chat.title, "Fractions");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].content, "1/2 + 1/3 ?");
        assert_eq!(chat.messages[1].content, "5/6");

        // written through to the cache
        let cached = cache.get("chat-1").unwrap().unwrap();
        assert_eq!(cached.messages.len(), 2);
    }

    #[tokio::test]
    async fn remote_not_found_registers_instead_of_failing() {
        let api = Arc::new(MockApi::default());
        let flags = Arc::new(EphemeralFlags::new());
        let resolver = resolver(Some(api.clone()), flags);

        let chat = resolver.resolve("chat-9").await;
        assert!(chat.messages.is_empty());
        assert_eq!(chat.session_id.as_deref(), Some("chat-9"));
        assert_eq!(api.initialized.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_falls_back_to_cache() {
        let cache: Arc<dyn ChatCache> = Arc::new(MemoryCache::new());
        let mut existing = Chat::new("chat-1").with_title("Histoire");
        existing.push_message(Message::user("la révolution?"));
        cache.upsert(&existing).unwrap();

        let flags = Arc::new(EphemeralFlags::new());
        let resolver = SessionResolver::new(None, cache, flags, Duration::from_secs(5));

        let chat = resolver.resolve("chat-1").await;
        assert_eq!(chat.title, "Histoire");
        assert_eq!(chat.messages.len(), 1);
    }

    #[tokio::test]
    async fn synthesized_chat_is_seeded_with_initial_prompt() {
        let flags = Arc::new(EphemeralFlags::new());
        flags.set_initial_prompt("chat-1", "Explique les fractions");
        let resolver = resolver(None, flags.clone());

        let chat = resolver.resolve("chat-1").await;
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, "Explique les fractions");
        // consumed once
        assert!(flags.take_initial_prompt("chat-1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_produces_empty_fallback_chat() {
        let api = Arc::new(MockApi {
            hang_forever: true,
            ..MockApi::default()
        });
        let flags = Arc::new(EphemeralFlags::new());
        let resolver = resolver(Some(api), flags);

        let started = tokio::time::Instant::now();
        let chat = resolver.resolve("chat-1").await;
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(chat.messages.is_empty());
        assert_eq!(chat.id, "chat-1");
    }
}
