//! v2 chat completions API.
//!
//! OpenAI-compatible request and response shapes, extended with two custom
//! delta fields: `think` carries the cumulative thinking text and `response`
//! carries the cumulative raw text, so a client can render either view
//! without re-parsing. Streams end with a `data: [DONE]` sentinel.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::engine::{EngineMessage, ToolCall};
use crate::session::{FinishReason, OutputEvent, SessionRequest, Usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

/// Request body for `POST /v2/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(alias = "model_name")]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub tool_choice: Option<Value>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<i64>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub stop: Option<Value>,
    #[serde(default)]
    pub think: Option<bool>,
    /// Passed through to the engine verbatim; explicit sampling parameters
    /// above take precedence over the same keys given here.
    #[serde(default)]
    pub options: Option<Value>,
}

impl ChatCompletionRequest {
    /// Fold the OpenAI-style sampling parameters into the engine's `options`
    /// map and produce the version-independent session request.
    pub fn into_session_request(self) -> SessionRequest {
        let mut options = match self.options {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(temperature) = self.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_p) = self.top_p {
            options.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(top_k) = self.top_k {
            options.insert("top_k".to_string(), json!(top_k));
        }
        if let Some(max_tokens) = self.max_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if let Some(stop) = self.stop {
            options.insert("stop".to_string(), stop);
        }

        let messages = self
            .messages
            .into_iter()
            .map(|m| EngineMessage {
                role: Some(m.role.as_str().to_string()),
                content: m.content,
                name: m.name,
                tool_calls: m.tool_calls,
                tool_call_id: m.tool_call_id,
            })
            .collect();

        SessionRequest {
            model: self.model,
            messages,
            tools: self.tools,
            think: self.think,
            options: if options.is_empty() {
                None
            } else {
                Some(Value::Object(options))
            },
            stream: self.stream,
            expose_thinking: self.think.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponseMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<String>,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatResponseMessage,
    pub finish_reason: &'static str,
}

/// Non-streaming response body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatStreamDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatStreamChoice {
    pub index: u32,
    pub delta: ChatStreamDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkError {
    pub message: String,
    pub code: &'static str,
}

/// Streamed chunk body, `object == "chat.completion.chunk"`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatStreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ChunkError>,
}

/// Identity shared by every chunk of one streamed completion.
#[derive(Debug, Clone)]
pub struct StreamMeta {
    pub id: String,
    pub model: String,
    pub created: i64,
    pub expose_thinking: bool,
}

impl StreamMeta {
    pub fn new(model: impl Into<String>, expose_thinking: bool) -> Self {
        let created = chrono::Utc::now().timestamp();
        Self {
            id: format!("chatcmpl-{}", created),
            model: model.into(),
            created,
            expose_thinking,
        }
    }

    fn chunk(&self, choice: ChatStreamChoice) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk",
            created: self.created,
            model: self.model.clone(),
            choices: vec![choice],
            usage: None,
            error: None,
        }
    }
}

/// Map one session event to a v2 stream chunk.
///
/// `content` carries the answer delta only; `think` and `response` repeat the
/// cumulative thinking and raw texts so late-joining renderers need no state.
pub fn encode_chunk(event: &OutputEvent, meta: &StreamMeta) -> Option<ChatCompletionChunk> {
    match event {
        OutputEvent::RoleAnnounce { role } => Some(meta.chunk(ChatStreamChoice {
            index: 0,
            delta: ChatStreamDelta {
                role: Some(role.clone()),
                ..Default::default()
            },
            finish_reason: None,
        })),
        OutputEvent::ContentDelta {
            answer_delta,
            totals,
            ..
        } => Some(meta.chunk(ChatStreamChoice {
            index: 0,
            delta: ChatStreamDelta {
                content: Some(answer_delta.clone()),
                think: if meta.expose_thinking {
                    Some(totals.thinking.clone())
                } else {
                    None
                },
                response: Some(totals.raw.clone()),
                ..Default::default()
            },
            finish_reason: None,
        })),
        OutputEvent::ToolCall { calls } => Some(meta.chunk(ChatStreamChoice {
            index: 0,
            delta: ChatStreamDelta {
                tool_calls: Some(calls.clone()),
                ..Default::default()
            },
            finish_reason: None,
        })),
        OutputEvent::Done {
            reason,
            usage,
            ..
        } => {
            let mut chunk = meta.chunk(ChatStreamChoice {
                index: 0,
                delta: ChatStreamDelta::default(),
                finish_reason: Some(reason.as_str()),
            });
            chunk.usage = *usage;
            if let FinishReason::Error(e) = reason {
                chunk.error = Some(ChunkError {
                    message: e.to_string(),
                    code: e.code(),
                });
            }
            Some(chunk)
        }
    }
}

/// Build the non-streaming response from the terminal session event.
pub fn encode_response(event: &OutputEvent, meta: &StreamMeta) -> Option<ChatCompletionResponse> {
    let OutputEvent::Done {
        reason,
        totals,
        usage,
        tool_calls,
    } = event
    else {
        return None;
    };
    Some(ChatCompletionResponse {
        id: meta.id.clone(),
        object: "chat.completion",
        created: meta.created,
        model: meta.model.clone(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatResponseMessage {
                role: "assistant",
                content: totals.answer.clone(),
                think: if meta.expose_thinking {
                    Some(totals.thinking.clone())
                } else {
                    None
                },
                response: totals.raw.clone(),
                tool_calls: tool_calls.clone(),
            },
            finish_reason: reason.as_str(),
        }],
        usage: *usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::reasoning_parser::ResponseTotals;

    fn meta() -> StreamMeta {
        StreamMeta {
            id: "chatcmpl-1700000000".to_string(),
            model: "qwen3".to_string(),
            created: 1_700_000_000,
            expose_thinking: true,
        }
    }

    fn totals() -> ResponseTotals {
        ResponseTotals {
            thinking: "calc 2+2".to_string(),
            answer: "4".to_string(),
            raw: "<think>calc 2+2</think>4".to_string(),
        }
    }

    #[test]
    fn test_meta_id_format() {
        let meta = StreamMeta::new("qwen3", true);
        assert!(meta.id.starts_with("chatcmpl-"));
        assert_eq!(meta.id, format!("chatcmpl-{}", meta.created));
    }

    #[test]
    fn test_role_announce_chunk() {
        let chunk = encode_chunk(
            &OutputEvent::RoleAnnounce {
                role: "assistant".to_string(),
            },
            &meta(),
        )
        .unwrap();
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["object"], "chat.completion.chunk");
        assert_eq!(json["choices"][0]["delta"]["role"], "assistant");
        assert!(json["choices"][0]["delta"].get("content").is_none());
        assert!(json["choices"][0].get("finish_reason").is_none());
    }

    #[test]
    fn test_content_delta_chunk() {
        let chunk = encode_chunk(
            &OutputEvent::ContentDelta {
                thinking_delta: String::new(),
                answer_delta: "4".to_string(),
                raw_delta: "4".to_string(),
                totals: totals(),
            },
            &meta(),
        )
        .unwrap();
        let json = serde_json::to_value(&chunk).unwrap();
        let delta = &json["choices"][0]["delta"];
        assert_eq!(delta["content"], "4");
        assert_eq!(delta["think"], "calc 2+2");
        assert_eq!(delta["response"], "<think>calc 2+2</think>4");
    }

    #[test]
    fn test_thinking_omitted_when_not_exposed() {
        let mut meta = meta();
        meta.expose_thinking = false;
        let chunk = encode_chunk(
            &OutputEvent::ContentDelta {
                thinking_delta: String::new(),
                answer_delta: "4".to_string(),
                raw_delta: "4".to_string(),
                totals: totals(),
            },
            &meta,
        )
        .unwrap();
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json["choices"][0]["delta"].get("think").is_none());
    }

    #[test]
    fn test_done_chunk_has_finish_reason_and_usage() {
        let chunk = encode_chunk(
            &OutputEvent::Done {
                reason: FinishReason::Stop,
                totals: totals(),
                usage: Usage::from_counts(Some(12), Some(3)),
                tool_calls: None,
            },
            &meta(),
        )
        .unwrap();
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert_eq!(json["usage"]["total_tokens"], 15);
        let delta = &json["choices"][0]["delta"];
        assert!(delta.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_error_done_chunk() {
        let chunk = encode_chunk(
            &OutputEvent::Done {
                reason: FinishReason::Error(EngineError::Rejected {
                    status: 404,
                    message: "model not found".to_string(),
                }),
                totals: totals(),
                usage: None,
                tool_calls: None,
            },
            &meta(),
        )
        .unwrap();
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["choices"][0]["finish_reason"], "error");
        assert_eq!(json["error"]["code"], "upstream_rejected");
    }

    #[test]
    fn test_encode_response_batch_shape() {
        let response = encode_response(
            &OutputEvent::Done {
                reason: FinishReason::Stop,
                totals: totals(),
                usage: Usage::from_counts(Some(10), Some(2)),
                tool_calls: None,
            },
            &meta(),
        )
        .unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["object"], "chat.completion");
        let message = &json["choices"][0]["message"];
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["content"], "4");
        assert_eq!(message["think"], "calc 2+2");
        assert_eq!(message["response"], "<think>calc 2+2</think>4");
        assert_eq!(json["usage"]["prompt_tokens"], 10);
    }

    #[test]
    fn test_sampling_params_fold_into_options() {
        let request: ChatCompletionRequest = serde_json::from_str(
            r#"{
                "model": "qwen3",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.2,
                "max_tokens": 128,
                "options": {"seed": 7}
            }"#,
        )
        .unwrap();
        let session = request.into_session_request();
        let options = session.options.unwrap();
        assert_eq!(options["temperature"], 0.2);
        assert_eq!(options["num_predict"], 128);
        assert_eq!(options["seed"], 7);
        assert_eq!(session.messages[0].role.as_deref(), Some("user"));
        assert!(session.expose_thinking);
    }

    #[test]
    fn test_think_false_hides_thinking() {
        let request: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"qwen3","messages":[{"role":"user","content":"hi"}],"think":false}"#,
        )
        .unwrap();
        let session = request.into_session_request();
        assert_eq!(session.think, Some(false));
        assert!(!session.expose_thinking);
        assert!(session.options.is_none());
    }
}
