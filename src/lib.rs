// Public modules
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod fallback;
pub mod observability;
pub mod repl;
pub mod resolver;
pub mod session;
pub mod sse;
pub mod store;
pub mod turn;
pub mod types;

// Re-exports
pub use api::{ChatApi, ChatStream};
pub use client::TutorClient;
pub use config::{ChatArgs, ChatConfig};
pub use error::{Error, Result};
pub use events::{ChatEvent, EventBus};
pub use fallback::{FallbackResponder, Subject};
pub use resolver::SessionResolver;
pub use session::TutorSession;
pub use store::{ChatCache, EphemeralFlags, FileCache, MemoryCache};
pub use turn::{TurnOrigin, TurnOutcome, TurnRunner, UserInput};
pub use types::*;
