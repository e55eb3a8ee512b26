//! Server-sent event decoding for streamed completions

use crate::error::{Result, ScoutError};
use futures::{Stream, StreamExt};

/// Incremental decoder turning response body bytes into `data:` payloads
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete `data:` payload
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        // Only complete lines are decoded, so a character split across
        // chunks is reassembled first.
        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// Turn a streaming HTTP response into a stream of `data:` payloads.
///
/// The `[DONE]` sentinel used by OpenAI-compatible APIs ends the stream.
pub fn data_events(
    provider: String,
    response: reqwest::Response,
) -> impl Stream<Item = Result<String>> + Send + 'static {
    async_stream::try_stream! {
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        'body: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ScoutError::Provider {
                provider: provider.clone(),
                status: None,
                message: format!("stream interrupted: {}", e),
            })?;
            for payload in decoder.push(&chunk) {
                if payload == "[DONE]" {
                    break 'body;
                }
                yield payload;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_splits_on_lines() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn test_decoder_buffers_partial_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert_eq!(decoder.push(b"xt\":\"hi\"}\r\n"), vec!["{\"text\":\"hi\"}"]);
    }

    #[test]
    fn test_decoder_reassembles_split_multibyte_characters() {
        let line = "data: {\"t\":\"é\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        assert_eq!(decoder.push(&line[split..]), vec!["{\"t\":\"é\"}"]);
    }

    #[test]
    fn test_decoder_ignores_event_and_comment_lines() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"event: content_block_delta\n: keepalive\ndata: x\n");
        assert_eq!(payloads, vec!["x"]);
    }
}
