//! Local chat persistence.
//!
//! The cache mirrors what the original product keeps in browser storage: one
//! array of chat records under a fixed key, read and written wholesale on
//! every mutation. [`FileCache`] is the durable implementation;
//! [`MemoryCache`] backs tests and degraded in-memory operation.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::Chat;

/// The local chat cache.
///
/// Implementations store the full chat array as a unit; the provided `get`
/// and `upsert` helpers express every mutation as a wholesale
/// read-modify-write, matching the single-cache-key model.
pub trait ChatCache: Send + Sync {
    /// Load all cached chats.
    fn load(&self) -> Result<Vec<Chat>>;

    /// Replace the cached chat array.
    fn store(&self, chats: &[Chat]) -> Result<()>;

    /// Look up one chat by id.
    fn get(&self, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self.load()?.into_iter().find(|c| c.id == chat_id))
    }

    /// Insert or replace one chat.
    fn upsert(&self, chat: &Chat) -> Result<()> {
        let mut chats = self.load()?;
        match chats.iter_mut().find(|c| c.id == chat.id) {
            Some(slot) => *slot = chat.clone(),
            None => chats.push(chat.clone()),
        }
        self.store(&chats)
    }

    /// Remove one chat by id.
    fn remove(&self, chat_id: &str) -> Result<()> {
        let mut chats = self.load()?;
        chats.retain(|c| c.id != chat_id);
        self.store(&chats)
    }
}

/// File-backed chat cache storing a single JSON array.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Create a cache backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default cache location under the user's home directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tutorstream")
            .join("chats.json")
    }

    /// The path this cache writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChatCache for FileCache {
    fn load(&self) -> Result<Vec<Chat>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&self.path)
            .map_err(|e| Error::storage(format!("failed to read {}", self.path.display()), Some(Box::new(e))))?;
        serde_json::from_slice(&data).map_err(|e| {
            Error::storage(
                format!("failed to parse {}", self.path.display()),
                Some(Box::new(e)),
            )
        })
    }

    fn store(&self, chats: &[Chat]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::storage(
                    format!("failed to create {}", parent.display()),
                    Some(Box::new(e)),
                )
            })?;
        }
        let bytes = serde_json::to_vec_pretty(chats)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes).map_err(|e| {
            Error::storage(
                format!("failed to write {}", tmp_path.display()),
                Some(Box::new(e)),
            )
        })?;
        match fs::rename(&tmp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if self.path.exists() {
                    fs::remove_file(&self.path)
                        .and_then(|_| fs::rename(&tmp_path, &self.path))
                        .map_err(|e| {
                            Error::storage(
                                format!("failed to replace {}", self.path.display()),
                                Some(Box::new(e)),
                            )
                        })
                } else {
                    Err(Error::storage(
                        format!("failed to rename into {}", self.path.display()),
                        Some(Box::new(rename_err)),
                    ))
                }
            }
        }
    }
}

/// In-memory chat cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    chats: Mutex<Vec<Chat>>,
}

impl MemoryCache {
    /// Create an empty in-memory cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatCache for MemoryCache {
    fn load(&self) -> Result<Vec<Chat>> {
        let chats = self.chats.lock().unwrap_or_else(|e| e.into_inner());
        Ok(chats.clone())
    }

    fn store(&self, chats: &[Chat]) -> Result<()> {
        let mut guard = self.chats.lock().unwrap_or_else(|e| e.into_inner());
        *guard = chats.to_vec();
        Ok(())
    }
}

/// Per-chat ephemeral markers, consumed once then cleared.
///
/// The host sets a blank-chat marker when navigating to a brand-new chat and
/// an initial prompt when a chat should open pre-seeded; the resolver takes
/// each at most once.
#[derive(Debug, Default)]
pub struct EphemeralFlags {
    blank: Mutex<HashSet<String>>,
    prompts: Mutex<HashMap<String, String>>,
}

impl EphemeralFlags {
    /// Create an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a chat id as deliberately blank.
    pub fn mark_blank(&self, chat_id: impl Into<String>) {
        let mut blank = self.blank.lock().unwrap_or_else(|e| e.into_inner());
        blank.insert(chat_id.into());
    }

    /// Consume the blank marker for a chat id.
    pub fn take_blank(&self, chat_id: &str) -> bool {
        let mut blank = self.blank.lock().unwrap_or_else(|e| e.into_inner());
        blank.remove(chat_id)
    }

    /// Stage an initial prompt for a chat id.
    pub fn set_initial_prompt(&self, chat_id: impl Into<String>, prompt: impl Into<String>) {
        let mut prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
        prompts.insert(chat_id.into(), prompt.into());
    }

    /// Consume the initial prompt for a chat id.
    pub fn take_initial_prompt(&self, chat_id: &str) -> Option<String> {
        let mut prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
        prompts.remove(chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "tutorstream_cache_{prefix}_{}_{}.json",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn missing_file_loads_empty() {
        let cache = FileCache::new(temp_file("missing"));
        assert!(cache.load().unwrap().is_empty());
    }

    #[test]
    fn file_cache_round_trip() {
        let path = temp_file("round_trip");
        let cache = FileCache::new(&path);

        let mut chat = Chat::new("chat-1").with_title("Géométrie");
        chat.push_message(Message::user("aire d'un cercle?"));
        chat.push_message(Message::assistant("pi r au carré").with_exchange_id("ex-1"));
        cache.upsert(&chat).unwrap();

        let reloaded = cache.get("chat-1").unwrap().unwrap();
        assert_eq!(reloaded.id, chat.id);
        assert_eq!(reloaded.title, chat.title);
        assert_eq!(reloaded.messages, chat.messages);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let cache = MemoryCache::new();
        let mut chat = Chat::new("chat-1");
        cache.upsert(&chat).unwrap();
        cache.upsert(&Chat::new("chat-2")).unwrap();

        chat.push_message(Message::user("hello"));
        cache.upsert(&chat).unwrap();

        let chats = cache.load().unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, "chat-1");
        assert_eq!(chats[0].messages.len(), 1);
    }

    #[test]
    fn remove_drops_only_matching_chat() {
        let cache = MemoryCache::new();
        cache.upsert(&Chat::new("chat-1")).unwrap();
        cache.upsert(&Chat::new("chat-2")).unwrap();
        cache.remove("chat-1").unwrap();

        let chats = cache.load().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "chat-2");
    }

    #[test]
    fn flags_are_consumed_once() {
        let flags = EphemeralFlags::new();
        flags.mark_blank("chat-1");
        flags.set_initial_prompt("chat-2", "Explique les fractions");

        assert!(flags.take_blank("chat-1"));
        assert!(!flags.take_blank("chat-1"));

        assert_eq!(
            flags.take_initial_prompt("chat-2").as_deref(),
            Some("Explique les fractions")
        );
        assert!(flags.take_initial_prompt("chat-2").is_none());
    }
}
