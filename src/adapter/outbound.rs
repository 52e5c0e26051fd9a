//! Outbound response handed back to the hosting server.
//!
//! # Responsibilities
//! - Translate the buffered status/headers/body of a synthetic response
//! - Decide between JSON and raw passthrough from the content type
//! - Build the JSON error payloads used by every failure path
//!
//! # Design Decisions
//! - A missing content type is treated as JSON
//! - A JSON content type with an unparseable body falls back to raw bytes
//! - Framing headers are dropped; the hosting server recomputes them

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

/// Body of an outbound response.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Json(Value),
    Raw(Bytes),
    Empty,
}

/// The single response produced for an inbound request.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: OutboundBody,
}

impl OutboundResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: OutboundBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Translate a finished synthetic response buffer.
    pub(crate) fn from_buffer(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Self {
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);

        let json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(is_json_content_type)
            .unwrap_or(true);

        let body = if body.is_empty() {
            OutboundBody::Empty
        } else if json {
            match serde_json::from_slice(&body) {
                Ok(value) => OutboundBody::Json(value),
                Err(_) => OutboundBody::Raw(body),
            }
        } else {
            OutboundBody::Raw(body)
        };

        Self::new(status, headers, body)
    }

    /// `{ "success": false, "error": <message> }` with the given status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(
            status,
            HeaderMap::new(),
            OutboundBody::Json(json!({
                "success": false,
                "error": message.into(),
            })),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &OutboundBody {
        &self.body
    }

    /// The body as JSON, if it was translated as JSON.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            OutboundBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let Self {
            status,
            mut headers,
            body,
        } = self;

        let body = match body {
            OutboundBody::Json(value) => {
                headers
                    .entry(header::CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("application/json"));
                match serde_json::to_vec(&value) {
                    Ok(bytes) => Body::from(bytes),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode outbound JSON");
                        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode response")
                            .into_response();
                    }
                }
            }
            OutboundBody::Raw(bytes) => Body::from(bytes),
            OutboundBody::Empty => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

/// True for `application/json` and `+json` media types.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
