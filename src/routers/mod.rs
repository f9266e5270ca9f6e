//! HTTP surface of the gateway.
//!
//! Two generation endpoints, one per API version, plus a health probe. Both
//! versions funnel into the same [`GatewayService`]; only the request
//! decoding and chunk encoding differ.

pub mod error;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::protocols::{chat, legacy};
use crate::session::{FinishReason, GatewayService, OutputEvent, SessionOutput, SessionRequest};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GatewayService>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/chat", post(v1_chat))
        .route("/v2/chat/completions", post(v2_chat_completions))
        .with_state(state)
}

async fn health() -> Response {
    (axum::http::StatusCode::OK, "Ok").into_response()
}

async fn v1_chat(
    State(state): State<AppState>,
    Json(request): Json<legacy::GenerateRequest>,
) -> Response {
    if request.prompt.is_empty() {
        return error::bad_request("empty_prompt", "prompt must not be empty");
    }
    if request.model_name.is_empty() {
        return error::bad_request("empty_model", "model name must not be empty");
    }

    let expose_thinking = request.think.unwrap_or(true);
    let mut session =
        SessionRequest::from_prompt(request.prompt, request.model_name, request.stream);
    session.think = request.think;
    session.expose_thinking = expose_thinking;

    match state.service.run_session(session).await {
        SessionOutput::Complete(event) => match *event {
            OutputEvent::Done {
                reason: FinishReason::Error(e),
                totals,
                ..
            } => error::upstream_error(&e, &totals),
            OutputEvent::Done { totals, .. } => {
                Json(legacy::GenerateResponse::from_totals(&totals, expose_thinking))
                    .into_response()
            }
            _ => error::internal_error("bad_session_output", "session ended without completion"),
        },
        SessionOutput::Events(events) => sse_response(events, false, move |event| {
            legacy::encode_chunk(event, expose_thinking)
                .map(|v| v.to_string())
        }),
    }
}

async fn v2_chat_completions(
    State(state): State<AppState>,
    Json(request): Json<chat::ChatCompletionRequest>,
) -> Response {
    if request.messages.is_empty() {
        return error::bad_request("empty_messages", "messages must not be empty");
    }
    if request.model.is_empty() {
        return error::bad_request("empty_model", "model name must not be empty");
    }

    let session = request.into_session_request();
    let meta = chat::StreamMeta::new(session.model.clone(), session.expose_thinking);

    match state.service.run_session(session).await {
        SessionOutput::Complete(event) => match *event {
            OutputEvent::Done {
                reason: FinishReason::Error(e),
                totals,
                ..
            } => error::upstream_error(&e, &totals),
            done @ OutputEvent::Done { .. } => match chat::encode_response(&done, &meta) {
                Some(response) => Json(response).into_response(),
                None => {
                    error::internal_error("bad_session_output", "session ended without completion")
                }
            },
            _ => error::internal_error("bad_session_output", "session ended without completion"),
        },
        SessionOutput::Events(events) => sse_response(events, true, move |event| {
            chat::encode_chunk(event, &meta)
                .and_then(|chunk| serde_json::to_string(&chunk).ok())
        }),
    }
}

/// Bridge session events into an SSE body.
///
/// A spawned task drains the event channel, encodes each event with the
/// version's encoder, and frames it as `data: <json>\n\n`. The terminal event
/// ends the bridge; `send_done_sentinel` controls the trailing
/// `data: [DONE]` frame, which only the v2 API emits. Dropping the response
/// body drops the frame receiver, which in turn ends the session task.
fn sse_response<F>(
    mut events: mpsc::UnboundedReceiver<OutputEvent>,
    send_done_sentinel: bool,
    encode: F,
) -> Response
where
    F: Fn(&OutputEvent) -> Option<String> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Result<Bytes, Infallible>>();

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let is_done = matches!(event, OutputEvent::Done { .. });
            if let Some(payload) = encode(&event) {
                let frame = format!("data: {}\n\n", payload);
                if tx.send(Ok(Bytes::from(frame))).is_err() {
                    debug!("response body dropped, ending event bridge");
                    return;
                }
            }
            if is_done {
                break;
            }
        }
        if send_done_sentinel {
            let _ = tx.send(Ok(Bytes::from("data: [DONE]\n\n")));
        }
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(UnboundedReceiverStream::new(rx)))
        .unwrap_or_else(|_| {
            error::internal_error("stream_setup", "failed to build streaming response")
        })
}
