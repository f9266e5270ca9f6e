//! HTTP error responses.
//!
//! Every error leaves the gateway in the same JSON envelope:
//! `{"error": {"message", "type", "code", ...}}`. Upstream failures add the
//! partial totals accumulated before the failure so callers can salvage the
//! text already generated.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::engine::EngineError;
use crate::reasoning_parser::ResponseTotals;

pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn internal_error(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
}

/// Map an upstream engine failure to the gateway's own status.
///
/// An unreachable engine is 503; an engine that answered with a refusal (bad
/// model, malformed request) or an undecodable payload is 502, since from the
/// caller's side the gateway relayed a bad upstream answer.
pub fn upstream_error(error: &EngineError, totals: &ResponseTotals) -> Response {
    let status = match error {
        EngineError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Rejected { .. } | EngineError::Protocol { .. } => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(json!({
            "error": {
                "message": error.to_string(),
                "type": status_code_to_str(status),
                "code": error.code(),
                "partial": totals,
            }
        })),
    )
        .into_response()
}

pub fn create_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "message": message.into(),
                "type": status_code_to_str(status),
                "code": code.into(),
            }
        })),
    )
        .into_response()
}

fn status_code_to_str(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::INTERNAL_SERVER_ERROR => "internal_server_error",
        StatusCode::BAD_GATEWAY => "bad_gateway",
        StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
        _ => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_maps_to_503() {
        let error = EngineError::Unavailable {
            reason: "connection refused".to_string(),
        };
        let response = upstream_error(&error, &ResponseTotals::default());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_rejected_maps_to_502() {
        let error = EngineError::Rejected {
            status: 404,
            message: "model not found".to_string(),
        };
        let response = upstream_error(&error, &ResponseTotals::default());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_protocol_maps_to_502() {
        let error = EngineError::Protocol {
            reason: "truncated line".to_string(),
        };
        let response = upstream_error(&error, &ResponseTotals::default());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_bad_request_shape() {
        let response = bad_request("empty_prompt", "prompt must not be empty");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
