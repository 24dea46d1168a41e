//! Server-Sent Events (SSE) processing for chat streaming responses.
//!
//! This module parses the tutor chat wire format: newline-delimited frames
//! prefixed `data: `, each a JSON object with an optional `content` delta
//! and/or a `done` completion flag.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::types::{StreamEvent, StreamFrame};

/// Process a stream of bytes into a stream of chat stream events.
///
/// Frames may be split across HTTP chunks at any byte, including inside a
/// multi-byte character, so incoming bytes are buffered raw and decoded only
/// once a full line is available. Blank lines are skipped. Malformed lines
/// surface as error items without ending the stream.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = BytesMut::new();
    let pending: VecDeque<Result<StreamEvent>> = VecDeque::new();

    stream::unfold(
        (stream, buffer, pending),
        move |(mut stream, mut buffer, mut pending)| async move {
            loop {
                // Drain events parsed from earlier lines first
                if let Some(event) = pending.pop_front() {
                    return Some((event, (stream, buffer, pending)));
                }

                // Then check for a complete line. The split happens at the
                // byte level; a multi-byte character straddling a chunk
                // boundary stays intact in the buffer until its line is whole
                if let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let line = buffer.split_to(newline + 1);
                    decode_line(&line[..line.len() - 1], &mut pending);
                    continue;
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, pending)));
                    }
                    None => {
                        // End of stream; a trailing frame may lack its newline
                        if !buffer.is_empty() {
                            let line = buffer.split_to(buffer.len());
                            decode_line(&line, &mut pending);
                        }
                        if let Some(event) = pending.pop_front() {
                            return Some((event, (stream, buffer, pending)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Decode one complete line as UTF-8 and parse it.
///
/// Invalid UTF-8 surfaces as an error item scoped to this line; the stream
/// continues.
fn decode_line(line: &[u8], pending: &mut VecDeque<Result<StreamEvent>>) {
    match std::str::from_utf8(line) {
        Ok(text) => parse_line(text, pending),
        Err(e) => pending.push_back(Err(Error::encoding(
            format!("Invalid UTF-8 in stream frame: {e}"),
            Some(Box::new(e)),
        ))),
    }
}

/// Parse one line of the stream, appending the events it encodes.
///
/// A single frame can encode both a delta and the completion flag, in which
/// case the delta is emitted first.
fn parse_line(line: &str, pending: &mut VecDeque<Result<StreamEvent>>) {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return;
    }

    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
        pending.push_back(Err(Error::serialization(
            format!("Malformed stream frame: missing 'data:' prefix in '{line}'"),
            None,
        )));
        return;
    };

    match serde_json::from_str::<StreamFrame>(payload) {
        Ok(frame) => {
            for event in frame.into_events() {
                pending.push_back(Ok(event));
            }
        }
        Err(e) => {
            pending.push_back(Err(Error::serialization(
                format!("Failed to parse frame JSON: {e}"),
                Some(Box::new(e)),
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from(c))),
        ))
    }

    #[tokio::test]
    async fn parse_single_delta() {
        let data: &[u8] = b"data: {\"content\":\"Hello\"}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        let event = events.next().await.unwrap();
        assert_eq!(event.unwrap(), StreamEvent::Delta("Hello".to_string()));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_deltas_then_done() {
        let data: &[u8] =
            b"data: {\"content\":\"Hel\"}\ndata: {\"content\":\"lo\"}\ndata: {\"done\":true}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Delta("Hel".to_string())
        );
        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Delta("lo".to_string())
        );
        assert_eq!(events.next().await.unwrap().unwrap(), StreamEvent::Done);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_frame_split_across_chunks() {
        let chunk1: &[u8] = b"data: {\"cont";
        let chunk2: &[u8] = b"ent\":\"Hi\"}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![chunk1, chunk2])));

        let event = events.next().await.unwrap();
        assert_eq!(event.unwrap(), StreamEvent::Delta("Hi".to_string()));
    }

    #[tokio::test]
    async fn combined_frame_emits_delta_before_done() {
        let data: &[u8] = b"data: {\"content\":\"fin\",\"done\":true}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Delta("fin".to_string())
        );
        assert_eq!(events.next().await.unwrap().unwrap(), StreamEvent::Done);
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        // the chunk boundary falls between the two bytes of 'é'
        let chunk1: &[u8] = b"data: {\"content\":\"\xC3";
        let chunk2: &[u8] = b"\xA9quation\"}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![chunk1, chunk2])));

        let event = events.next().await.unwrap();
        assert_eq!(event.unwrap(), StreamEvent::Delta("équation".to_string()));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_line_surfaces_error_without_ending_stream() {
        let data: &[u8] = b"data: \xFF\xFE\ndata: {\"content\":\"ok\"}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        let event = events.next().await.unwrap();
        assert!(event.is_err());
        if let Err(e) = event {
            assert!(e.to_string().contains("Invalid UTF-8"));
        }
        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Delta("ok".to_string())
        );
    }

    #[tokio::test]
    async fn trailing_frame_without_newline_is_parsed() {
        let data: &[u8] = b"data: {\"content\":\"tail\"}";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        let event = events.next().await.unwrap();
        assert_eq!(event.unwrap(), StreamEvent::Delta("tail".to_string()));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let data: &[u8] = b"\ndata: {\"content\":\"a\"}\n\n\ndata: {\"done\":true}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Delta("a".to_string())
        );
        assert_eq!(events.next().await.unwrap().unwrap(), StreamEvent::Done);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_line_surfaces_error_without_ending_stream() {
        let data: &[u8] = b"garbage without prefix\ndata: {\"content\":\"ok\"}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        assert!(events.next().await.unwrap().is_err());
        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Delta("ok".to_string())
        );
    }

    #[tokio::test]
    async fn invalid_json_surfaces_error() {
        let data: &[u8] = b"data: {not json}\n";
        let mut events = Box::pin(process_sse(byte_stream(vec![data])));

        let event = events.next().await.unwrap();
        assert!(event.is_err());
        if let Err(e) = event {
            assert!(e.to_string().contains("Failed to parse frame JSON"));
        }
    }
}
