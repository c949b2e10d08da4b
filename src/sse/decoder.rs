//! Frame decoding for chunked SSE bodies.
//!
//! Network chunks arrive at arbitrary granularity: one frame may span many
//! chunks, one chunk may hold several frames, and a chunk may even end in the
//! middle of a multi-byte character. [`FrameDecoder`] carries the unconsumed
//! remainder between chunks and only ever yields complete frames.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{stream, Stream};
use futures_util::StreamExt;
use tracing::debug;

use crate::sse::events::SseFrame;
use crate::sse::parser::parse_sse_frame;
use crate::traits::{ByteStream, HttpError};

/// Blank-line frame boundary after line-ending normalization.
const FRAME_BOUNDARY: &str = "\n\n";

/// Stream of complete frames decoded from a response body.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>>;

/// Incremental decoder from text or byte chunks to [`SseFrame`]s.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Text received but not yet part of a complete frame
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending_bytes: Vec<u8>,
    /// A chunk ended in `\r`; it is joined with the next chunk
    held_cr: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw byte chunk, returning every frame it completes.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let text = self.decode_utf8(chunk);
        self.push_str(&text)
    }

    /// Feed a text chunk, returning every frame it completes.
    ///
    /// Only the new text is normalized and searched; the held-back buffer
    /// never contains a complete boundary.
    pub fn push_str(&mut self, text: &str) -> Vec<SseFrame> {
        let mut incoming = String::with_capacity(text.len() + 1);
        if std::mem::take(&mut self.held_cr) {
            incoming.push('\r');
        }
        incoming.push_str(text);
        // A CR at the end may be the first half of a CRLF
        if incoming.ends_with('\r') {
            incoming.pop();
            self.held_cr = true;
        }
        if incoming.contains('\r') {
            incoming = incoming.replace("\r\n", "\n");
        }

        // The boundary may straddle the old tail and the new text
        let mut search_from = if self.buffer.ends_with('\n') {
            self.buffer.len() - 1
        } else {
            self.buffer.len()
        };
        self.buffer.push_str(&incoming);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[search_from..].find(FRAME_BOUNDARY) {
            let end = search_from + offset;
            let frame = parse_sse_frame(&self.buffer[consumed..end]);
            consumed = end + FRAME_BOUNDARY.len();
            search_from = consumed;
            if !frame.is_empty() {
                frames.push(frame);
            }
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        frames
    }

    /// Signal end of input. Any incomplete trailing frame is discarded.
    ///
    /// Returns true when something was discarded.
    pub fn finish(&mut self) -> bool {
        let leftover = self.buffer.trim().len() + self.pending_bytes.len();
        self.buffer.clear();
        self.pending_bytes.clear();
        self.held_cr = false;
        if leftover > 0 {
            debug!(bytes = leftover, "Discarding truncated frame at end of stream");
            true
        } else {
            false
        }
    }

    /// Bytes currently held back waiting for more input.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending_bytes.len() + usize::from(self.held_cr)
    }

    /// Decode as much of `chunk` as forms complete UTF-8, keeping an
    /// incomplete trailing sequence for the next chunk. Invalid sequences
    /// become U+FFFD.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending_bytes = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Adapt a response body into a lazy stream of complete frames.
///
/// A body error is yielded once and ends the stream. At end of input the
/// truncated remainder, if any, is dropped.
pub fn decode_frames(body: ByteStream) -> FrameStream {
    let frames = stream::unfold(
        (body, FrameDecoder::new(), VecDeque::new(), false),
        |(mut body, mut decoder, mut ready, mut finished)| async move {
            loop {
                if let Some(frame) = ready.pop_front() {
                    return Some((Ok(frame), (body, decoder, ready, finished)));
                }
                if finished {
                    return None;
                }

                match body.next().await {
                    Some(Ok(chunk)) => {
                        ready.extend(decoder.push_bytes(&chunk));
                    }
                    Some(Err(e)) => {
                        finished = true;
                        return Some((Err(e), (body, decoder, ready, finished)));
                    }
                    None => {
                        decoder.finish();
                        finished = true;
                    }
                }
            }
        },
    );

    Box::pin(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const BODY: &str = "data: {\"type\":\"start\",\"mode\":\"rag\"}\n\n\
                        data: {\"type\":\"token\",\"content\":\"Total \"}\n\n\
                        data: {\"type\":\"token\",\"content\":\"revenue: 42 €\"}\n\n\
                        data: {\"type\":\"end\",\"content\":null}\n\n";

    fn decode_all(chunks: &[&[u8]]) -> Vec<SseFrame> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(decoder.push_bytes(chunk));
        }
        decoder.finish();
        frames
    }

    #[test]
    fn test_single_chunk_yields_all_frames() {
        let frames = decode_all(&[BODY.as_bytes()]);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[1].data, "{\"type\":\"token\",\"content\":\"Total \"}");
    }

    #[test]
    fn test_every_two_way_split_is_equivalent() {
        let expected = decode_all(&[BODY.as_bytes()]);
        let bytes = BODY.as_bytes();
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), expected, "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_is_equivalent() {
        let expected = decode_all(&[BODY.as_bytes()]);
        let chunks: Vec<&[u8]> = BODY.as_bytes().chunks(1).collect();
        assert_eq!(decode_all(&chunks), expected);
    }

    #[test]
    fn test_split_multibyte_character_is_carried_over() {
        let text = "data: {\"type\":\"token\",\"content\":\"é\"}\n\n";
        let bytes = text.as_bytes();
        let accent = text.find('é').unwrap();

        let mut decoder = FrameDecoder::new();
        assert!(decoder.push_bytes(&bytes[..accent + 1]).is_empty());
        assert!(decoder.buffered_len() > 0);
        let frames = decoder.push_bytes(&bytes[accent + 1..]);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].data.contains('é'));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push_bytes(b"data: {\"a\":\"\xff\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].data.contains('\u{FFFD}'));
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.push_str("data: {\"type\":\"token\",\"content\":\"a\"}\r\n\r");
        assert!(frames.is_empty());
        frames.extend(decoder.push_str("\ndata: {\"type\":\"end\"}\r\n\r\n"));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data, "{\"type\":\"end\"}");
    }

    #[test]
    fn test_crlf_split_across_every_chunk() {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for piece in ["data: {\"type\":\"end\"}\r", "\n", "\r", "\n"] {
            frames.extend(decoder.push_str(piece));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\":\"end\"}");
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_large_frame_in_small_chunks() {
        let content = "x".repeat(64 * 1024);
        let body = format!(
            "data: {{\"type\":\"token\",\"content\":\"{}\"}}\r\n\r\ndata: {{\"type\":\"end\"}}\r\n\r\n",
            content
        );

        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in body.as_bytes().chunks(3) {
            frames.extend(decoder.push_bytes(chunk));
        }

        assert_eq!(frames.len(), 2);
        assert!(frames[0].data.contains(&content));
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_comment_only_frames_are_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push_str(": ping\n\n\n\ndata: {\"type\":\"end\"}\n\n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_truncated_trailing_frame_is_discarded() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push_str("data: {\"type\":\"end\"}\n\ndata: {\"type\":\"tok");
        assert_eq!(frames.len(), 1);
        assert!(decoder.finish());
        assert_eq!(decoder.buffered_len(), 0);
        assert!(!decoder.finish());
    }

    #[tokio::test]
    async fn test_decode_frames_stream() {
        let chunks: Vec<Result<Bytes, HttpError>> = BODY
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let body: ByteStream = Box::pin(futures::stream::iter(chunks));

        let frames: Vec<SseFrame> = decode_frames(body)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(frames, decode_all(&[BODY.as_bytes()]));
    }

    #[tokio::test]
    async fn test_decode_frames_surfaces_body_error_once() {
        let items: Vec<Result<Bytes, HttpError>> = vec![
            Ok(Bytes::from("data: {\"type\":\"token\",\"content\":\"a\"}\n\n")),
            Err(HttpError::Io("connection reset".to_string())),
            Ok(Bytes::from("data: {\"type\":\"end\"}\n\n")),
        ];
        let body: ByteStream = Box::pin(futures::stream::iter(items));

        let results: Vec<Result<SseFrame, HttpError>> = decode_frames(body).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(HttpError::Io(_))));
    }
}
