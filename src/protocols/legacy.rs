//! Legacy v1 API: single prompt in, classified totals out.
//!
//! Every streamed chunk repeats the *cumulative* totals rather than a delta;
//! v1 consumers render the latest chunk wholesale. The stream is terminated
//! by closing the connection, with no sentinel frame.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::reasoning_parser::ResponseTotals;
use crate::session::{FinishReason, OutputEvent};

/// Request body for `POST /api/v1/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(alias = "model")]
    pub model_name: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub think: Option<bool>,
}

/// Response body (and streamed chunk shape) for the v1 API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    pub think: String,
    pub content: String,
    pub full_response: String,
}

impl GenerateResponse {
    pub fn from_totals(totals: &ResponseTotals, expose_thinking: bool) -> Self {
        Self {
            think: if expose_thinking {
                totals.thinking.clone()
            } else {
                String::new()
            },
            content: totals.answer.clone(),
            full_response: totals.raw.clone(),
        }
    }
}

/// Map one session event to a v1 wire chunk.
///
/// Role announcements and tool calls have no v1 representation; a clean
/// terminal event produces nothing (the connection simply closes), while a
/// failed terminal event produces an error object that still carries the
/// totals accumulated before the failure.
pub fn encode_chunk(event: &OutputEvent, expose_thinking: bool) -> Option<Value> {
    match event {
        OutputEvent::ContentDelta { totals, .. } => {
            serde_json::to_value(GenerateResponse::from_totals(totals, expose_thinking)).ok()
        }
        OutputEvent::Done {
            reason: FinishReason::Error(e),
            totals,
            ..
        } => Some(json!({
            "error": {
                "message": e.to_string(),
                "code": e.code(),
            },
            "think": if expose_thinking { totals.thinking.as_str() } else { "" },
            "content": totals.answer,
            "full_response": totals.raw,
        })),
        _ => None,
    }
}
