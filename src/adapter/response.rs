//! Synthetic response handed to the embedded framework.
//!
//! # Responsibilities
//! - Buffer status code, headers and body chunks
//! - Provide the status/header/write/end surface plus `json`, `send` and
//!   `redirect` helpers
//! - Resolve the request completion on the terminal end
//!
//! # Design Decisions
//! - Cloneable handle over a shared buffer so the embedded framework can
//!   finish from a spawned task
//! - Writes after the terminal end are ignored
//! - Invalid status codes or header values are logged and skipped

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use super::completion::{Completion, Resolution};
use super::outbound::OutboundResponse;
use crate::embedded::DispatchError;

#[derive(Debug)]
struct ResponseBuffer {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    headers_sent: bool,
    finished: bool,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            headers_sent: false,
            finished: false,
        }
    }
}

/// Response accumulator the embedded dispatch function writes into.
#[derive(Clone, Debug)]
pub struct EmbeddedResponse {
    buffer: Arc<Mutex<ResponseBuffer>>,
    completion: Completion,
}

impl EmbeddedResponse {
    pub(crate) fn new(completion: Completion) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(ResponseBuffer::default())),
            completion,
        }
    }

    fn buffer(&self) -> MutexGuard<'_, ResponseBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status code. Returns the handle for chaining.
    pub fn status(&self, code: u16) -> &Self {
        match StatusCode::from_u16(code) {
            Ok(code) => {
                let mut buffer = self.buffer();
                if buffer.finished {
                    tracing::debug!(status = %code, "Status set after end, ignoring");
                } else {
                    buffer.status = code;
                }
            }
            Err(_) => tracing::warn!(code, "Invalid status code from embedded dispatch"),
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.buffer().status
    }

    pub fn set_header(&self, name: &str, value: &str) -> &Self {
        let parsed = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        );
        match parsed {
            (Ok(name), Ok(value)) => {
                let mut buffer = self.buffer();
                if buffer.finished {
                    tracing::debug!(header = %name, "Header set after end, ignoring");
                } else {
                    buffer.headers.insert(name, value);
                }
            }
            _ => tracing::warn!(header = name, "Invalid header from embedded dispatch"),
        }
        self
    }

    /// Current value of a buffered header.
    pub fn header(&self, name: &str) -> Option<String> {
        self.buffer()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    pub fn remove_header(&self, name: &str) -> &Self {
        let mut buffer = self.buffer();
        if !buffer.finished {
            buffer.headers.remove(name);
        }
        self
    }

    /// Write the status line and a block of headers at once.
    ///
    /// A name in the block replaces any value set earlier; repeated names
    /// within the block are all kept.
    pub fn write_head(&self, status: StatusCode, headers: HeaderMap) -> &Self {
        let mut buffer = self.buffer();
        if buffer.finished {
            tracing::debug!(status = %status, "Header block written after end, ignoring");
            return self;
        }
        buffer.status = status;
        let mut current = None;
        for (name, value) in headers {
            match name {
                Some(name) => {
                    buffer.headers.insert(name.clone(), value);
                    current = Some(name);
                }
                None => {
                    if let Some(name) = &current {
                        buffer.headers.append(name.clone(), value);
                    }
                }
            }
        }
        buffer.headers_sent = true;
        self
    }

    /// Append a body chunk. Returns `false` once the response has ended.
    pub fn write(&self, chunk: impl AsRef<[u8]>) -> bool {
        let mut buffer = self.buffer();
        if buffer.finished {
            tracing::debug!("Write after end, ignoring");
            return false;
        }
        buffer.body.extend_from_slice(chunk.as_ref());
        buffer.headers_sent = true;
        true
    }

    /// Finish the response with whatever has been buffered.
    pub fn end(&self) {
        self.finish(None);
    }

    /// Append a final chunk and finish the response.
    pub fn end_with(&self, chunk: impl AsRef<[u8]>) {
        self.finish(Some(chunk.as_ref()));
    }

    fn finish(&self, chunk: Option<&[u8]>) {
        let (status, headers, body) = {
            let mut buffer = self.buffer();
            if buffer.finished {
                tracing::debug!("Response already ended, ignoring");
                return;
            }
            if let Some(chunk) = chunk {
                buffer.body.extend_from_slice(chunk);
            }
            buffer.finished = true;
            buffer.headers_sent = true;
            (
                buffer.status,
                buffer.headers.clone(),
                Bytes::from(std::mem::take(&mut buffer.body)),
            )
        };

        let response = OutboundResponse::from_buffer(status, headers, body);
        self.completion.resolve(Resolution::Finished(response));
    }

    /// Serialize `value` as JSON and end the response.
    pub fn json<T>(&self, value: &T) -> Result<(), DispatchError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.default_content_type("application/json");
        self.end_with(bytes);
        Ok(())
    }

    /// End the response with a text body (HTML unless a content type is set).
    pub fn send(&self, body: impl AsRef<str>) {
        self.default_content_type("text/html; charset=utf-8");
        self.end_with(body.as_ref());
    }

    /// Redirect with `302 Found`.
    pub fn redirect(&self, location: &str) {
        self.redirect_with(StatusCode::FOUND, location);
    }

    pub fn redirect_with(&self, status: StatusCode, location: &str) {
        let reason = status.canonical_reason().unwrap_or("Redirecting");
        self.status(status.as_u16())
            .set_header(header::LOCATION.as_str(), location)
            .set_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
        self.end_with(format!("{reason}. Redirecting to {location}"));
    }

    /// Whether any header or body bytes have been committed.
    pub fn headers_sent(&self) -> bool {
        self.buffer().headers_sent
    }

    /// Whether the terminal end has run.
    pub fn is_finished(&self) -> bool {
        self.buffer().finished
    }

    fn default_content_type(&self, content_type: &'static str) {
        let mut buffer = self.buffer();
        if !buffer.finished {
            buffer
                .headers
                .entry(header::CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::OutboundBody;
    use serde_json::json;
    use tokio::sync::oneshot;

    fn response() -> (EmbeddedResponse, oneshot::Receiver<Resolution>) {
        let (completion, rx) = Completion::channel();
        (EmbeddedResponse::new(completion), rx)
    }

    fn finished(mut rx: oneshot::Receiver<Resolution>) -> OutboundResponse {
        match rx.try_recv() {
            Ok(Resolution::Finished(res)) => res,
            other => panic!("expected a finished response, got {other:?}"),
        }
    }

    #[test]
    fn test_status_json_chain() {
        let (res, rx) = response();
        res.status(404)
            .json(&json!({"success": false, "message": "Order not found"}))
            .unwrap();

        let out = finished(rx);
        assert_eq!(out.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            out.json(),
            Some(&json!({"success": false, "message": "Order not found"}))
        );
        assert_eq!(
            out.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_chunks_are_buffered_until_end() {
        let (res, rx) = response();
        res.set_header("Content-Type", "text/plain");
        assert!(res.write("hello "));
        assert!(res.headers_sent());
        assert!(!res.is_finished());
        res.end_with("world");
        assert!(!res.write("ignored"));

        let out = finished(rx);
        assert_eq!(out.body(), &OutboundBody::Raw(Bytes::from_static(b"hello world")));
    }

    #[test]
    fn test_second_end_is_ignored() {
        let (res, rx) = response();
        res.status(201).json(&json!({"id": 1})).unwrap();
        res.status(500).end_with("late");
        assert_eq!(res.status_code(), StatusCode::CREATED);

        let out = finished(rx);
        assert_eq!(out.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_header_accessors() {
        let (res, _rx) = response();
        res.set_header("X-Cart-Id", "abc");
        assert_eq!(res.header("x-cart-id").as_deref(), Some("abc"));
        res.remove_header("X-CART-ID");
        assert!(res.header("x-cart-id").is_none());

        res.set_header("bad header", "v");
        assert!(res.header("bad header").is_none());
    }

    #[test]
    fn test_invalid_status_is_ignored() {
        let (res, _rx) = response();
        res.status(42);
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_write_head_and_end() {
        let (res, rx) = response();
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        res.write_head(StatusCode::ACCEPTED, headers);
        res.end_with(r#"{"queued":true}"#);

        let out = finished(rx);
        assert_eq!(out.status(), StatusCode::ACCEPTED);
        assert_eq!(out.json(), Some(&json!({"queued": true})));
    }

    #[test]
    fn test_write_head_replaces_earlier_headers() {
        let (res, rx) = response();
        res.set_header("Content-Type", "text/plain");
        res.set_header("X-Cart-Id", "abc");

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        res.write_head(StatusCode::OK, headers);
        res.end_with(r#"{"ok":true}"#);

        let out = finished(rx);
        let content_types: Vec<_> = out.headers().get_all(header::CONTENT_TYPE).iter().collect();
        assert_eq!(content_types, vec!["application/json"]);
        assert_eq!(out.headers().get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(out.headers().get("x-cart-id").unwrap(), "abc");
        assert_eq!(out.json(), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_send_defaults_to_html() {
        let (res, rx) = response();
        res.send("<p>ok</p>");
        let out = finished(rx);
        assert_eq!(
            out.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert!(matches!(out.body(), OutboundBody::Raw(_)));
    }

    #[test]
    fn test_redirect() {
        let (res, rx) = response();
        res.redirect("/admin/login");
        let out = finished(rx);
        assert_eq!(out.status(), StatusCode::FOUND);
        assert_eq!(out.headers().get(header::LOCATION).unwrap(), "/admin/login");
        assert_eq!(
            out.body(),
            &OutboundBody::Raw(Bytes::from_static(b"Found. Redirecting to /admin/login"))
        );
    }

    #[test]
    fn test_end_without_body() {
        let (res, rx) = response();
        res.status(204).end();
        let out = finished(rx);
        assert_eq!(out.status(), StatusCode::NO_CONTENT);
        assert_eq!(out.body(), &OutboundBody::Empty);
    }
}
