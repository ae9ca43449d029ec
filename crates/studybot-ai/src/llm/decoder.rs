//! Incremental decoder for the engine's newline-delimited JSON output
//!
//! The engine streams one JSON object per line:
//!
//! ```text
//! {"model":"qwen3:8b","message":{"role":"assistant","content":"Hel"},"done":false}
//! {"model":"qwen3:8b","message":{"role":"assistant","content":"lo"},"done":false}
//! {"model":"qwen3:8b","message":{"role":"assistant","content":""},"done":true,"total_duration":123}
//! ```
//!
//! Network reads do not respect line boundaries, so the decoder keeps the
//! incomplete tail of the last read and prepends it to the next one. The tail
//! is kept as bytes: a multi-byte character split across two reads is only
//! interpreted once the whole line is present.

use std::pin::Pin;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AiError, Result};

/// One decoded engine line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub content_delta: String,
    pub is_final: bool,
    /// Only present on the final chunk
    pub model: Option<String>,
    /// Engine-reported generation time in nanoseconds (final chunk only)
    pub total_duration: Option<u64>,
}

#[cfg(test)]
impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content_delta: content.into(),
            ..Self::default()
        }
    }
}

/// Boxed stream of decoded chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Wire shape shared by streamed lines and the one-shot response.
#[derive(Debug, Deserialize)]
pub(crate) struct EngineChatLine {
    #[serde(default)]
    pub message: Option<EngineMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EngineMessage {
    #[serde(default)]
    pub content: String,
}

impl EngineChatLine {
    pub(crate) fn into_chunk(self) -> StreamChunk {
        StreamChunk {
            content_delta: self.message.map(|m| m.content).unwrap_or_default(),
            is_final: self.done,
            model: self.model.filter(|_| self.done),
            total_duration: self.total_duration.filter(|_| self.done),
        }
    }
}

/// Line reassembly state for one engine response.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    finished: bool,
    malformed: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read and return every chunk completed by it.
    ///
    /// Once a chunk flagged `done` has been produced, the rest of the input
    /// (including anything after it in the same read) is ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        if self.finished {
            return chunks;
        }

        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let Some(chunk) = self.decode_line(&line[..pos]) else {
                continue;
            };

            let is_final = chunk.is_final;
            chunks.push(chunk);
            if is_final {
                self.finished = true;
                self.buffer.clear();
                break;
            }
        }

        chunks
    }

    /// Flush the trailing line left in the buffer when the stream ends.
    pub fn finish(&mut self) -> Option<StreamChunk> {
        if self.finished {
            return None;
        }
        self.finished = true;

        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    /// Whether a `done` chunk (or end of input) has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of lines dropped because they were not valid JSON.
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<StreamChunk> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_slice::<EngineChatLine>(line) {
            Ok(parsed) => Some(parsed.into_chunk()),
            Err(err) => {
                self.malformed += 1;
                warn!(
                    error = %err,
                    line = %String::from_utf8_lossy(line),
                    "Dropping malformed engine chunk"
                );
                None
            }
        }
    }
}

/// Decode a byte stream of engine output into content chunks.
///
/// The returned stream ends after the `done` chunk or when the input ends,
/// whichever comes first. A read error ends the stream with that error.
pub fn decode_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<AiError> + Send + 'static,
{
    Box::pin(try_stream! {
        let mut decoder = NdjsonDecoder::new();
        let mut bytes = Box::pin(bytes);

        while let Some(read) = bytes.next().await {
            let read = read.map_err(Into::<AiError>::into)?;
            for chunk in decoder.feed(read.as_ref()) {
                yield chunk;
            }
            if decoder.is_finished() {
                break;
            }
        }

        if let Some(chunk) = decoder.finish() {
            yield chunk;
        }

        let malformed = decoder.malformed_lines();
        if malformed > 0 {
            debug!(malformed, "Engine stream ended with dropped lines");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn line(content: &str, done: bool) -> String {
        format!(
            "{}\n",
            serde_json::json!({
                "model": "qwen3:8b",
                "message": {"role": "assistant", "content": content},
                "done": done,
            })
        )
    }

    async fn collect(reads: Vec<Vec<u8>>) -> Vec<StreamChunk> {
        let input = stream::iter(reads.into_iter().map(Ok::<_, AiError>));
        decode_stream(input)
            .map(|chunk| chunk.unwrap())
            .collect::<Vec<_>>()
            .await
    }

    fn text_of(chunks: &[StreamChunk]) -> String {
        chunks.iter().map(|c| c.content_delta.as_str()).collect()
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let first = line("Hello", false);
        let second = line(", world", false);
        let last = line("!", true);

        let joined = format!("{first}{second}{last}");
        let split_at = first.len() + 10;
        let reads = vec![
            joined.as_bytes()[..split_at].to_vec(),
            joined.as_bytes()[split_at..].to_vec(),
        ];

        let chunks = collect(reads).await;
        assert_eq!(text_of(&chunks), "Hello, world!");
        assert_eq!(chunks.len(), 3);
        assert!(chunks.last().unwrap().is_final);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_reads() {
        let raw = line("สวัสดี café", true);
        let bytes = raw.as_bytes();
        let split_at = raw.find("é").unwrap() + 1;

        let chunks = collect(vec![bytes[..split_at].to_vec(), bytes[split_at..].to_vec()]).await;
        assert_eq!(text_of(&chunks), "สวัสดี café");
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline_is_flushed() {
        let mut raw = line("a", false);
        raw.push_str(line("b", true).trim_end());

        let chunks = collect(vec![raw.into_bytes()]).await;
        assert_eq!(text_of(&chunks), "ab");
        assert!(chunks.last().unwrap().is_final);
    }

    #[tokio::test]
    async fn test_malformed_line_is_dropped() {
        let raw = format!("{}{{not json\n{}", line("a", false), line("b", true));
        let chunks = collect(vec![raw.into_bytes()]).await;
        assert_eq!(text_of(&chunks), "ab");
    }

    #[test]
    fn test_malformed_lines_counted() {
        let mut decoder = NdjsonDecoder::new();
        let chunks = decoder.feed(b"garbage\n\n   \n{\"message\":{\"content\":\"x\"},\"done\":false}\n");
        assert_eq!(chunks, vec![StreamChunk::text("x")]);
        assert_eq!(decoder.malformed_lines(), 1);
    }

    #[test]
    fn test_input_after_done_is_ignored() {
        let mut decoder = NdjsonDecoder::new();
        let raw = format!("{}{}", line("end", true), line("late", false));
        let chunks = decoder.feed(raw.as_bytes());

        assert_eq!(chunks.len(), 1);
        assert!(decoder.is_finished());
        assert!(decoder.feed(line("later", false).as_bytes()).is_empty());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_final_chunk_carries_metadata() {
        let mut decoder = NdjsonDecoder::new();
        let chunks = decoder.feed(
            b"{\"model\":\"qwen3:8b\",\"message\":{\"content\":\"\"},\"done\":true,\"total_duration\":42}\n",
        );
        assert_eq!(chunks[0].model.as_deref(), Some("qwen3:8b"));
        assert_eq!(chunks[0].total_duration, Some(42));
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let reads = vec![
            Ok(line("partial", false).into_bytes()),
            Err(AiError::InvalidFormat("connection reset".to_string())),
        ];
        let results: Vec<_> = decode_stream(stream::iter(reads)).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().content_delta, "partial");
        assert!(results[1].is_err());
    }
}
