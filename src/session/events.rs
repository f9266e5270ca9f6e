//! Output events produced by a generation session.

use serde::Serialize;

use crate::engine::{EngineError, ToolCall};
use crate::reasoning_parser::ResponseTotals;

/// Token accounting reported by the upstream engine on completion.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn from_counts(prompt: Option<u64>, completion: Option<u64>) -> Option<Self> {
        match (prompt, completion) {
            (None, None) => None,
            _ => {
                let prompt_tokens = prompt.unwrap_or(0);
                let completion_tokens = completion.unwrap_or(0);
                Some(Self {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                })
            }
        }
    }
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone)]
pub enum FinishReason {
    Stop,
    Cancelled,
    Error(EngineError),
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Cancelled => "cancelled",
            FinishReason::Error(_) => "error",
        }
    }
}

/// One unit of session output.
///
/// A session produces a strictly ordered sequence of these; ordering is the
/// only guarantee consumers may depend on. The terminal `Done` event carries
/// the final classified totals so that error payloads can still report the
/// partial text accumulated before the failure.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    /// First event of a streamed session, announcing the assistant role.
    RoleAnnounce { role: String },
    /// Newly classified text for one upstream token, plus the running totals.
    ContentDelta {
        thinking_delta: String,
        answer_delta: String,
        raw_delta: String,
        totals: ResponseTotals,
    },
    /// Tool invocations emitted by the model.
    ToolCall { calls: Vec<ToolCall> },
    /// Terminal event; exactly one per session.
    Done {
        reason: FinishReason,
        totals: ResponseTotals,
        usage: Option<Usage>,
        tool_calls: Option<Vec<ToolCall>>,
    },
}
