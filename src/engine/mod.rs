//! Upstream engine client.
//!
//! The gateway treats the generation engine (Ollama) as an opaque upstream:
//! one batch call or one NDJSON token stream per request, plus a small error
//! taxonomy distinguishing "could not reach the engine" from "the engine
//! rejected this request".

pub mod ollama;
pub mod types;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use ollama::OllamaClient;
pub use types::{ChatChunk, EngineChatRequest, EngineMessage, FunctionCall, ToolCall};

/// Errors surfaced by the upstream engine client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("upstream engine unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("upstream engine rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed upstream payload: {reason}")]
    Protocol { reason: String },
}

impl EngineError {
    /// Stable machine-readable tag for wire payloads.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Unavailable { .. } => "upstream_unavailable",
            EngineError::Rejected { .. } => "upstream_rejected",
            EngineError::Protocol { .. } => "upstream_protocol",
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EngineError::Protocol {
                reason: err.to_string(),
            }
        } else {
            // Connect failures, timeouts and transport errors all mean the
            // engine could not be reached or did not answer in time.
            EngineError::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Token stream returned by a streaming chat call.
pub type ChatChunkStream = BoxStream<'static, EngineResult<ChatChunk>>;

/// Client capability consumed by the session layer.
///
/// Implemented by [`OllamaClient`] in production and by scripted mocks in
/// tests.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Run one blocking generation call and return the final chunk, which
    /// carries the complete message and eval counts.
    async fn chat(&self, request: EngineChatRequest) -> EngineResult<ChatChunk>;

    /// Open one streaming generation call.
    async fn chat_stream(&self, request: EngineChatRequest) -> EngineResult<ChatChunkStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let unavailable = EngineError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert_eq!(unavailable.code(), "upstream_unavailable");

        let rejected = EngineError::Rejected {
            status: 404,
            message: "model not found".to_string(),
        };
        assert_eq!(rejected.code(), "upstream_rejected");
        assert_eq!(
            rejected.to_string(),
            "upstream engine rejected request (status 404): model not found"
        );
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
