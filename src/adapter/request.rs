//! Synthetic request handed to the embedded framework.
//!
//! Mirrors the request object an embedded router and its middleware expect:
//! method, normalized URL under the mount prefix, header lookup, parsed body,
//! flat query map and route params. The stream-shaped methods are no-ops; the
//! body has already been drained by the time the request is built.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use serde_json::Value;

use super::inbound::InboundRequest;

/// Request as seen by the embedded dispatch function.
#[derive(Debug, Clone)]
pub struct EmbeddedRequest {
    method: Method,
    url: String,
    path: String,
    original_url: String,
    headers: HeaderMap,
    body: Option<Value>,
    raw_body: Bytes,
    query: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    paused: bool,
}

impl EmbeddedRequest {
    /// Build the synthetic request for an inbound request.
    pub fn from_inbound(inbound: InboundRequest, mount_prefix: &str) -> Self {
        let (method, uri, headers, segments, raw_body, body) = inbound.into_parts();
        let query_string = uri.query().filter(|q| !q.is_empty());

        let path = normalize_path(mount_prefix, &segments);
        let url = match query_string {
            Some(q) => format!("{path}?{q}"),
            None => path.clone(),
        };
        let query = query_string.map(parse_query).unwrap_or_default();
        let original_url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            method,
            url,
            path,
            original_url,
            headers,
            body,
            raw_body,
            query,
            params: BTreeMap::new(),
            paused: false,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Normalized path plus the original query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Normalized path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// URL as received by the hosting server, still percent-encoded.
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Parsed JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Body bytes exactly as received.
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Route params captured by the embedded router.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: BTreeMap<String, String>) {
        self.params = params;
    }

    // Stream compatibility. Middleware written against a readable request
    // may probe for these; the body is already buffered so they do nothing.

    /// Always `None`: the body was consumed before dispatch.
    pub fn read(&mut self) -> Option<Bytes> {
        None
    }

    pub fn pause(&mut self) -> &mut Self {
        self.paused = true;
        self
    }

    pub fn resume(&mut self) -> &mut Self {
        self.paused = false;
        self
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Present for API shape only; returns the destination untouched.
    pub fn pipe<W>(&mut self, destination: W) -> W {
        destination
    }

    /// Present for API shape only. The listener is accepted and dropped,
    /// never invoked: no `data` or `end` event fires on a buffered request.
    pub fn on<F>(&mut self, event: &str, _listener: F) -> &mut Self
    where
        F: FnMut(&[u8]),
    {
        tracing::trace!(event, "Ignoring stream listener on synthetic request");
        self
    }
}

/// Mount prefix followed by the wildcard segments joined with `/`.
pub fn normalize_path(mount_prefix: &str, segments: &[String]) -> String {
    format!("{}/{}", mount_prefix.trim_end_matches('/'), segments.join("/"))
}

/// Flat query map; a repeated key keeps its last value.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
