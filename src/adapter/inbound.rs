//! Inbound request captured from the hosting server.
//!
//! # Responsibilities
//! - Hold the hosting-side view of a request (method, URI, headers, body)
//! - Carry the wildcard path segments extracted by the hosting router
//! - Parse the JSON body eagerly for methods that conventionally carry one
//!
//! # Design Decisions
//! - Immutable once constructed
//! - Malformed or empty bodies are treated as absent, never rejected

use axum::body::Bytes;
use axum::http::{request::Parts, HeaderMap, Method, Uri};
use serde_json::Value;

/// A request as received by the hosting HTTP layer.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    segments: Vec<String>,
    raw_body: Bytes,
    body: Option<Value>,
}

impl InboundRequest {
    /// Capture an inbound request, parsing the body when the method carries one.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        segments: Vec<String>,
        raw_body: Bytes,
    ) -> Self {
        let body = parse_body(&method, &raw_body);
        Self {
            method,
            uri,
            headers,
            segments,
            raw_body,
            body,
        }
    }

    /// Build from the parts of an axum request whose body was already collected.
    pub fn from_parts(parts: Parts, segments: Vec<String>, raw_body: Bytes) -> Self {
        Self::new(parts.method, parts.uri, parts.headers, segments, raw_body)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Wildcard path segments captured by the hosting route.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Original query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri.query().filter(|q| !q.is_empty())
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Parsed JSON body, present only for POST/PUT/PATCH with valid JSON.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Method, Uri, HeaderMap, Vec<String>, Bytes, Option<Value>) {
        (
            self.method,
            self.uri,
            self.headers,
            self.segments,
            self.raw_body,
            self.body,
        )
    }
}

/// Methods whose body is parsed as JSON.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn parse_body(method: &Method, raw: &Bytes) -> Option<Value> {
    if !carries_body(method) || raw.is_empty() {
        return None;
    }

    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(method = %method, error = %e, "Ignoring unparseable request body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(method: Method, body: &'static str) -> InboundRequest {
        InboundRequest::new(
            method,
            Uri::from_static("/api/orders"),
            HeaderMap::new(),
            vec!["orders".into()],
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[test]
    fn test_body_parsed_for_write_methods() {
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            let req = inbound(method, r#"{"qty":2}"#);
            assert_eq!(req.body(), Some(&serde_json::json!({"qty": 2})));
        }
    }

    #[test]
    fn test_body_ignored_for_read_methods() {
        let req = inbound(Method::GET, r#"{"qty":2}"#);
        assert!(req.body().is_none());
        assert_eq!(req.raw_body().len(), 9);
    }

    #[test]
    fn test_malformed_body_is_absent() {
        let req = inbound(Method::POST, "{not json");
        assert!(req.body().is_none());

        let req = inbound(Method::PATCH, "");
        assert!(req.body().is_none());
    }

    #[test]
    fn test_empty_query_is_none() {
        let req = InboundRequest::new(
            Method::GET,
            Uri::from_static("/api/products?"),
            HeaderMap::new(),
            vec!["products".into()],
            Bytes::new(),
        );
        assert_eq!(req.query(), None);
    }
}
