//! Ollama HTTP client with NDJSON stream decoding.

use std::{borrow::Cow, time::Duration};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::debug;

use super::{ChatChunk, ChatChunkStream, EngineChatRequest, EngineClient, EngineError, EngineResult};
use crate::config::{ConfigError, ConfigResult, GatewayConfig};

/// Client for a local `ollama serve` instance.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(config: &GatewayConfig) -> ConfigResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::ValidationFailed {
                reason: format!("failed to build upstream HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    async fn send(&self, request: &EngineChatRequest) -> EngineResult<reqwest::Response> {
        let response = self
            .http
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(EngineError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Rejected {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }
        Ok(response)
    }
}

/// Ollama error bodies are `{"error": "..."}`; fall back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl EngineClient for OllamaClient {
    async fn chat(&self, mut request: EngineChatRequest) -> EngineResult<ChatChunk> {
        request.stream = false;
        debug!(model = %request.model, "upstream batch chat call");
        let response = self.send(&request).await?;
        response
            .json::<ChatChunk>()
            .await
            .map_err(|e| EngineError::Protocol {
                reason: e.to_string(),
            })
    }

    async fn chat_stream(&self, mut request: EngineChatRequest) -> EngineResult<ChatChunkStream> {
        request.stream = true;
        debug!(model = %request.model, "upstream streaming chat call");
        let response = self.send(&request).await?;
        let bytes = response.bytes_stream();

        let stream = futures_util::stream::unfold(
            (bytes, NdjsonDecoder::new(), false),
            |(mut bytes, mut decoder, exhausted)| async move {
                loop {
                    if let Some(line) = decoder.next_line() {
                        return Some((decode_chunk(&line), (bytes, decoder, exhausted)));
                    }
                    if exhausted {
                        return match decoder.take_remaining() {
                            Some(line) => Some((decode_chunk(&line), (bytes, decoder, true))),
                            None => None,
                        };
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => decoder.push_chunk(&chunk),
                        Some(Err(e)) => {
                            return Some((Err(EngineError::from(e)), (bytes, decoder, true)))
                        }
                        None => {
                            return match decoder.take_remaining() {
                                Some(line) => Some((decode_chunk(&line), (bytes, decoder, true))),
                                None => None,
                            }
                        }
                    }
                }
            },
        );
        Ok(stream.boxed())
    }
}

fn decode_chunk(line: &str) -> EngineResult<ChatChunk> {
    serde_json::from_str::<ChatChunk>(line).map_err(|e| EngineError::Protocol {
        reason: format!("undecodable stream line: {}", e),
    })
}

/// Buffers network chunks and yields complete NDJSON lines.
///
/// Ollama terminates each streamed JSON object with a newline; a network
/// chunk can end mid-object or mid-character, so raw bytes are carried across
/// pushes and text decoding happens only on complete lines. Splitting on
/// `b'\n'` is safe because a newline byte never occurs inside a multi-byte
/// UTF-8 sequence.
#[derive(Debug, Default)]
struct NdjsonDecoder {
    pending: Vec<u8>,
}

impl NdjsonDecoder {
    fn new() -> Self {
        Self::default()
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.pending.iter().position(|&b| b == b'\n')?;
            let line = decode_line(&self.pending[..pos]);
            self.pending.drain(..pos + 1);
            if !line.is_empty() {
                return Some(line);
            }
        }
    }

    fn take_remaining(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = decode_line(&rest);
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => String::from_utf8_lossy(bytes),
    }
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_yields_complete_lines() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push_chunk(b"{\"done\":false}\n{\"done\":");
        assert_eq!(decoder.next_line().as_deref(), Some("{\"done\":false}"));
        assert_eq!(decoder.next_line(), None);

        decoder.push_chunk(b"true}\n");
        assert_eq!(decoder.next_line().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn test_decoder_normalizes_crlf_and_skips_blanks() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push_chunk(b"{\"a\":1}\r\n\r\n{\"b\":2}\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(decoder.next_line().as_deref(), Some("{\"b\":2}"));
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn test_decoder_carries_split_multibyte_character() {
        let payload = "{\"message\":{\"content\":\"\u{65e5}\"},\"done\":false}\n".as_bytes();
        // Split inside the 3-byte character.
        let mid = payload.iter().position(|&b| b > 0x7f).unwrap() + 1;
        let mut decoder = NdjsonDecoder::new();
        decoder.push_chunk(&payload[..mid]);
        assert_eq!(decoder.next_line(), None);
        decoder.push_chunk(&payload[mid..]);

        let line = decoder.next_line().unwrap();
        let chunk: ChatChunk = serde_json::from_str(&line).unwrap();
        assert_eq!(
            chunk.message.unwrap().content.as_deref(),
            Some("\u{65e5}")
        );
    }

    #[test]
    fn test_decoder_take_remaining() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push_chunk(b"{\"tail\":true}");
        assert_eq!(decoder.next_line(), None);
        assert_eq!(decoder.take_remaining().as_deref(), Some("{\"tail\":true}"));
        assert_eq!(decoder.take_remaining(), None);
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error":"model not found"}"#),
            "model not found"
        );
        assert_eq!(extract_error_message("plain failure"), "plain failure");
    }
}
