use serde::{Deserialize, Serialize};

/// One wire frame of the chat stream.
///
/// Frames arrive newline-delimited with a `data: ` prefix. A frame carries a
/// content delta, a completion flag, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// A text delta to append to the in-progress response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Set to true on the final frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

impl StreamFrame {
    /// Returns the events encoded by this frame, in order.
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(content) = self.content
            && !content.is_empty()
        {
            events.push(StreamEvent::Delta(content));
        }
        if self.done == Some(true) {
            events.push(StreamEvent::Done);
        }
        events
    }
}

/// A parsed event from the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A content delta, to be appended to the accumulation buffer.
    Delta(String),

    /// The authoritative completion signal.
    Done,
}
