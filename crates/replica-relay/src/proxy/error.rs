//! Forwarder error taxonomy and its JSON envelope
//!
//! Validation failures are client errors and are returned before any
//! network I/O. Transport and body failures are caught where they happen
//! and rendered as a 500 with the same envelope. Nothing here retries.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Response, StatusCode, header},
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while forwarding one request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForwardError {
    /// No `url` query parameter
    #[error("Missing URL parameter")]
    MissingParameter,

    /// Resolved target escapes the trusted upstream
    #[error("Invalid URL '{target}': {reason}")]
    InvalidDestination { target: String, reason: String },

    /// Upstream could not be reached
    #[error("Failed to proxy request: {0}")]
    UpstreamUnavailable(String),

    /// Upstream answered but its body could not be read
    #[error("Failed to process response: {0}")]
    ResponseProcessing(String),
}

/// JSON body of every synthesized error response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::MissingParameter | ForwardError::InvalidDestination { .. } => {
                StatusCode::BAD_REQUEST
            }
            ForwardError::UpstreamUnavailable(_) | ForwardError::ResponseProcessing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ForwardError::MissingParameter => "missing_parameter",
            ForwardError::InvalidDestination { .. } => "invalid_destination",
            ForwardError::UpstreamUnavailable(_) => "upstream_unavailable",
            ForwardError::ResponseProcessing(_) => "response_processing",
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ForwardError::MissingParameter => ErrorEnvelope {
                error: "Missing URL parameter".to_string(),
                details: None,
                message: Some("Pass the replica target in the `url` query parameter".to_string()),
            },
            ForwardError::InvalidDestination { reason, .. } => ErrorEnvelope {
                error: "Invalid URL".to_string(),
                details: Some(reason.clone()),
                message: None,
            },
            ForwardError::UpstreamUnavailable(details) => ErrorEnvelope {
                error: "Failed to proxy request".to_string(),
                details: Some(details.clone()),
                message: None,
            },
            ForwardError::ResponseProcessing(details) => ErrorEnvelope {
                error: "Failed to process response".to_string(),
                details: Some(details.clone()),
                message: None,
            },
        }
    }

    /// Render as a JSON error response carrying the given CORS headers
    pub fn into_response(self, cors: HeaderMap) -> Response<Body> {
        let body = serde_json::to_vec(&self.envelope()).unwrap_or_else(|_| {
            br#"{"error":"Internal error"}"#.to_vec()
        });

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.extend(cors);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ForwardError::MissingParameter.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ForwardError::InvalidDestination {
                target: "x".into(),
                reason: "y".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ForwardError::UpstreamUnavailable("refused".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ForwardError::ResponseProcessing("eof".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_value(
            ForwardError::UpstreamUnavailable("connection refused".into()).envelope(),
        )
        .unwrap();
        assert_eq!(json["error"], "Failed to proxy request");
        assert_eq!(json["details"], "connection refused");
        assert!(json.get("message").is_none());
    }

    #[tokio::test]
    async fn test_into_response_sets_json_and_cors() {
        let mut cors = HeaderMap::new();
        cors.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );

        let response = ForwardError::InvalidDestination {
            target: "http://evil.example".into(),
            reason: "nope".into(),
        }
        .into_response(cors);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.contains("\"error\":\"Invalid URL\""));
    }
}
