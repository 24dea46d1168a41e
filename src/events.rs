//! Chat event channel.
//!
//! Loosely-coupled UI regions (the transcript view, the whiteboard, toast
//! notifications) observe the chat flow through an explicit broadcast channel
//! rather than ambient global state: subscribers receive in-progress deltas,
//! finalized messages, and non-blocking warnings.

use tokio::sync::broadcast;

use crate::types::Message;

const DEFAULT_CAPACITY: usize = 64;

/// An event published while a chat is being driven.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A content delta arrived for the in-progress assistant response.
    Delta {
        /// The chat the delta belongs to.
        chat_id: String,
        /// The delta text, in arrival order.
        text: String,
    },

    /// An assistant message was finalized and appended.
    Finalized {
        /// The chat the message was appended to.
        chat_id: String,
        /// The finalized message.
        message: Message,
    },

    /// A non-blocking warning the host should surface to the user.
    Warning {
        /// The chat the warning concerns.
        chat_id: String,
        /// Human-readable warning text.
        message: String,
    },

    /// Whiteboard content was shared into a chat.
    WhiteboardShared {
        /// The chat receiving the whiteboard content.
        chat_id: String,
        /// The captured screenshot.
        screenshot: String,
    },
}

/// Broadcast channel for [`ChatEvent`]s.
///
/// Cloning the bus shares the underlying channel. Publishing when nobody is
/// subscribed is fine; events are simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to chat events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: ChatEvent) {
        // A send error only means nobody is listening
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
