// Public modules
pub mod chat;
pub mod message;
pub mod session;
pub mod stream;

// Re-exports
pub use chat::{Chat, DEFAULT_CHAT_TITLE};
pub use message::{Message, MessageRole};
pub use session::{
    ExchangeRecord, SessionInitParams, SessionRecord, SessionSummary, StreamRequest, WireMessage,
};
pub use stream::{StreamEvent, StreamFrame};
