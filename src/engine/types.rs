//! Wire types for the Ollama chat API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One message in the upstream chat payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl EngineMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Tool invocation emitted by the model.
///
/// `arguments` is kept as a raw JSON value and passed through to the client
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineChatRequest {
    pub model: String,
    pub messages: Vec<EngineMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// One decoded unit of the Ollama chat response.
///
/// Batch responses are a single chunk with `done == true`; streamed
/// responses deliver many, with eval counts only on the final one.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<EngineMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_chunk_decodes_stream_unit() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"qwen3","message":{"role":"assistant","content":"hi"},"done":false}"#,
        )
        .unwrap();
        let message = chunk.message.unwrap();
        assert_eq!(message.role.as_deref(), Some("assistant"));
        assert_eq!(message.content.as_deref(), Some("hi"));
        assert!(!chunk.done);
    }

    #[test]
    fn test_chat_chunk_decodes_final_counts() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":""},"done":true,"prompt_eval_count":12,"eval_count":34}"#,
        )
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.prompt_eval_count, Some(12));
        assert_eq!(chunk.eval_count, Some(34));
    }

    #[test]
    fn test_chat_chunk_decodes_tool_calls() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","tool_calls":[{"function":{"name":"save_thought","arguments":{"thought":"2+2=4"}}}]},"done":false}"#,
        )
        .unwrap();
        let calls = chunk.message.unwrap().tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "save_thought");
        assert_eq!(calls[0].function.arguments["thought"], "2+2=4");
    }

    #[test]
    fn test_request_omits_empty_fields() {
        let request = EngineChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![EngineMessage::user("hello")],
            stream: false,
            tools: None,
            think: None,
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("think").is_none());
        assert!(json.get("options").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
