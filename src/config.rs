//! Configuration for the tutor chat client.
//!
//! This module provides CLI argument parsing via `arrrg` and a resolved
//! configuration structure controlling endpoints, cache location, and the
//! flow's safety timings.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

/// Deadline for session resolution before an empty fallback chat is created.
const DEFAULT_RESOLVE_DEADLINE: Duration = Duration::from_secs(5);

/// Deadline for draining a chat stream before finalization is forced.
const DEFAULT_STREAM_DEADLINE: Duration = Duration::from_secs(30);

/// Delay before the single completion-signal retry.
const DEFAULT_COMPLETE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Simulated thinking delay for the offline fallback responder.
const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(1500);

/// Command-line arguments for the tutor-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the tutor chat API.
    #[arrrg(optional, "Base URL of the tutor chat API", "URL")]
    pub base_url: Option<String>,

    /// Auth token; falls back to TUTORSTREAM_API_TOKEN, then to offline mode.
    #[arrrg(optional, "Auth token (default: TUTORSTREAM_API_TOKEN)", "TOKEN")]
    pub token: Option<String>,

    /// Path of the local chat cache file.
    #[arrrg(optional, "Chat cache file (default: ~/.tutorstream/chats.json)", "PATH")]
    pub cache_path: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved configuration for the chat flow.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL of the tutor chat API.
    pub base_url: Option<String>,

    /// Auth token. `None` means unauthenticated: no remote session, fallback
    /// replies only.
    pub auth_token: Option<String>,

    /// Path of the local chat cache file; `None` uses the default location.
    pub cache_path: Option<PathBuf>,

    /// Deadline for session resolution.
    pub resolve_deadline: Duration,

    /// Deadline for draining a chat stream.
    pub stream_deadline: Duration,

    /// Delay before retrying a failed completion signal.
    pub complete_retry_delay: Duration,

    /// Simulated delay before a fallback reply.
    pub fallback_delay: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Resolve deadline: 5s
    /// - Stream deadline: 30s
    /// - Completion retry delay: 2s
    /// - Fallback delay: 1.5s
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            cache_path: None,
            resolve_deadline: DEFAULT_RESOLVE_DEADLINE,
            stream_deadline: DEFAULT_STREAM_DEADLINE,
            complete_retry_delay: DEFAULT_COMPLETE_RETRY_DELAY,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            use_color: true,
        }
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the auth token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the cache path.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Sets the session resolution deadline.
    pub fn with_resolve_deadline(mut self, deadline: Duration) -> Self {
        self.resolve_deadline = deadline;
        self
    }

    /// Sets the stream drain deadline.
    pub fn with_stream_deadline(mut self, deadline: Duration) -> Self {
        self.stream_deadline = deadline;
        self
    }

    /// Sets the completion-signal retry delay.
    pub fn with_complete_retry_delay(mut self, delay: Duration) -> Self {
        self.complete_retry_delay = delay;
        self
    }

    /// Sets the fallback responder delay.
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            base_url: args.base_url,
            auth_token: args.token,
            cache_path: args.cache_path.map(PathBuf::from),
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}
