//! Generation sessions.
//!
//! One session handles one client request end to end: it waits for a
//! concurrency slot, drives the upstream engine, feeds every emitted token
//! through the response accumulator, and emits ordered [`OutputEvent`]s.
//! Per-session state (parser, totals) is owned by the session task and never
//! shared across requests.

pub mod events;

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub use events::{FinishReason, OutputEvent, Usage};

use crate::config::{ConfigResult, GatewayConfig};
use crate::core::ConcurrencyGate;
use crate::engine::{EngineChatRequest, EngineClient, EngineMessage};
use crate::reasoning_parser::{ResponseAccumulator, TagDelimiters};

/// Version-independent description of one generation request.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub model: String,
    pub messages: Vec<EngineMessage>,
    pub tools: Option<Value>,
    pub think: Option<bool>,
    pub options: Option<Value>,
    pub stream: bool,
    /// Whether thinking spans are surfaced to the caller. The parser always
    /// runs regardless; this only controls exposure at encoding time.
    pub expose_thinking: bool,
}

impl SessionRequest {
    /// Shorthand for the legacy single-prompt form.
    pub fn from_prompt(prompt: impl Into<String>, model: impl Into<String>, stream: bool) -> Self {
        Self {
            model: model.into(),
            messages: vec![EngineMessage::user(prompt)],
            tools: None,
            think: None,
            options: None,
            stream,
            expose_thinking: true,
        }
    }

    fn to_engine(&self, stream: bool) -> EngineChatRequest {
        EngineChatRequest {
            model: self.model.clone(),
            messages: self.messages.clone(),
            stream,
            tools: self.tools.clone(),
            think: self.think,
            options: self.options.clone(),
        }
    }
}

/// Result of running one session.
pub enum SessionOutput {
    /// Non-streaming: the single terminal event.
    Complete(Box<OutputEvent>),
    /// Streaming: ordered events, ending with exactly one `Done`.
    Events(mpsc::UnboundedReceiver<OutputEvent>),
}

/// Process-scoped generation service.
///
/// Constructed once by the composition root and passed by reference; holds
/// the only cross-request shared state (the admission gate).
pub struct GatewayService {
    engine: Arc<dyn EngineClient>,
    gate: ConcurrencyGate,
    delimiters: TagDelimiters,
}

impl GatewayService {
    pub fn new(engine: Arc<dyn EngineClient>, config: &GatewayConfig) -> ConfigResult<Self> {
        Ok(Self {
            engine,
            gate: ConcurrencyGate::new(config.max_concurrent_generations)?,
            delimiters: config.delimiters(),
        })
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run one request, streaming or not, per its `stream` flag.
    ///
    /// Upstream failures never escape as errors; they are converted to a
    /// terminal `Done` event carrying the cause and whatever totals had been
    /// accumulated before the failure.
    pub async fn run_session(&self, request: SessionRequest) -> SessionOutput {
        if request.stream {
            SessionOutput::Events(self.spawn_stream(request))
        } else {
            SessionOutput::Complete(Box::new(self.run_batch(request).await))
        }
    }

    async fn run_batch(&self, request: SessionRequest) -> OutputEvent {
        let _ticket = self.gate.acquire().await;
        let mut accumulator = ResponseAccumulator::new(self.delimiters.clone());

        match self.engine.chat(request.to_engine(false)).await {
            Ok(chunk) => {
                let message = chunk.message.unwrap_or_default();
                if let Some(content) = message.content.as_deref() {
                    accumulator.consume(content);
                }
                accumulator.finish();
                OutputEvent::Done {
                    reason: FinishReason::Stop,
                    totals: accumulator.totals().clone(),
                    usage: Usage::from_counts(chunk.prompt_eval_count, chunk.eval_count),
                    tool_calls: message.tool_calls,
                }
            }
            Err(e) => {
                warn!(error = %e, model = %request.model, "batch generation failed");
                OutputEvent::Done {
                    reason: FinishReason::Error(e),
                    totals: accumulator.totals().clone(),
                    usage: None,
                    tool_calls: None,
                }
            }
        }
    }

    fn spawn_stream(&self, request: SessionRequest) -> mpsc::UnboundedReceiver<OutputEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let gate = self.gate.clone();
        let delimiters = self.delimiters.clone();
        tokio::spawn(run_stream_task(engine, gate, delimiters, request, tx));
        rx
    }
}

/// Drives one streaming session.
///
/// The gate ticket is held for the lifetime of the task and released by drop
/// on every exit path: normal completion, upstream error, and client
/// disconnect (observed as a failed send).
async fn run_stream_task(
    engine: Arc<dyn EngineClient>,
    gate: ConcurrencyGate,
    delimiters: TagDelimiters,
    request: SessionRequest,
    tx: mpsc::UnboundedSender<OutputEvent>,
) {
    let _ticket = gate.acquire().await;
    let mut accumulator = ResponseAccumulator::new(delimiters);
    let mut usage = None;
    let mut role_sent = false;

    let mut stream = match engine.chat_stream(request.to_engine(true)).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, model = %request.model, "failed to open upstream stream");
            let _ = tx.send(OutputEvent::Done {
                reason: FinishReason::Error(e),
                totals: accumulator.totals().clone(),
                usage: None,
                tool_calls: None,
            });
            return;
        }
    };

    while let Some(item) = stream.next().await {
        if tx.is_closed() {
            debug!(
                reason = FinishReason::Cancelled.as_str(),
                "client disconnected, ending session"
            );
            return;
        }

        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, model = %request.model, "upstream stream failed");
                let _ = tx.send(OutputEvent::Done {
                    reason: FinishReason::Error(e),
                    totals: accumulator.totals().clone(),
                    usage,
                    tool_calls: None,
                });
                return;
            }
        };

        let mut events = Vec::new();
        if let Some(message) = chunk.message {
            if !role_sent {
                if let Some(role) = message.role.clone() {
                    events.push(OutputEvent::RoleAnnounce { role });
                    role_sent = true;
                }
            }
            if let Some(content) = message.content.as_deref() {
                if !content.is_empty() {
                    let outcome = accumulator.consume(content);
                    events.push(OutputEvent::ContentDelta {
                        thinking_delta: outcome.thinking_delta,
                        answer_delta: outcome.answer_delta,
                        raw_delta: content.to_string(),
                        totals: accumulator.totals().clone(),
                    });
                }
            }
            if let Some(calls) = message.tool_calls {
                if !calls.is_empty() {
                    events.push(OutputEvent::ToolCall { calls });
                }
            }
        }
        if chunk.done {
            usage = Usage::from_counts(chunk.prompt_eval_count, chunk.eval_count);
        }

        // Emit before awaiting the next upstream token; a failed send means
        // the consumer is gone and the slot must be freed promptly.
        for event in events {
            if tx.send(event).is_err() {
                debug!(
                    reason = FinishReason::Cancelled.as_str(),
                    "client disconnected, ending session"
                );
                return;
            }
        }
    }

    let flushed = accumulator.finish();
    if !flushed.is_empty() {
        let sent = tx.send(OutputEvent::ContentDelta {
            thinking_delta: flushed.thinking_delta,
            answer_delta: flushed.answer_delta,
            raw_delta: String::new(),
            totals: accumulator.totals().clone(),
        });
        if sent.is_err() {
            return;
        }
    }

    let _ = tx.send(OutputEvent::Done {
        reason: FinishReason::Stop,
        totals: accumulator.totals().clone(),
        usage,
        tool_calls: None,
    });
}
