//! Upstream forwarding to the backend service.
//!
//! # Responsibilities
//! - Rebuild the synthetic request as an HTTP request to the backend
//! - Relay status, headers and body into the synthetic response
//! - Report transport failures through the completion callback
//!
//! # Design Decisions
//! - Only plain HTTP backends (the gateway sits next to the backend)
//! - Hop-by-hop headers are stripped both ways
//! - The target keeps the client's percent-encoding (original URL, not the
//!   decoded synthetic URL)
//! - Connect timeout on the connector; the adapter window bounds the rest
//! - No retries

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, uri::Authority, Request, Response, StatusCode},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use super::{Dispatch, DispatchError};
use crate::adapter::{EmbeddedRequest, EmbeddedResponse, Next};
use crate::config::UpstreamConfig;
use crate::http::headers::strip_hop_by_hop;

/// Relays embedded requests to the configured backend.
#[derive(Clone, Debug)]
pub struct UpstreamDispatch {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    base_path: String,
    max_response_bytes: usize,
}

impl UpstreamDispatch {
    pub fn new(config: &UpstreamConfig) -> Result<Self, DispatchError> {
        let base = url::Url::parse(&config.base_url)
            .map_err(|e| DispatchError::InvalidUpstream(format!("{}: {e}", config.base_url)))?;

        if base.scheme() != "http" {
            return Err(DispatchError::InvalidUpstream(format!(
                "unsupported scheme `{}`, only http is supported",
                base.scheme()
            )));
        }

        let host = base
            .host_str()
            .ok_or_else(|| DispatchError::InvalidUpstream("base URL has no host".to_string()))?;
        let port = base.port_or_known_default().unwrap_or(80);
        let authority = Authority::from_str(&format!("{host}:{port}"))
            .map_err(|e| DispatchError::InvalidUpstream(e.to_string()))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            authority,
            base_path: base.path().trim_end_matches('/').to_string(),
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Backend URI for an already percent-encoded path and query.
    pub fn target_uri(&self, url: &str) -> String {
        format!("http://{}{}{}", self.authority, self.base_path, url)
    }

    fn build_request(&self, req: &EmbeddedRequest) -> Result<Request<Body>, DispatchError> {
        let mut headers = req.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let mut builder = Request::builder()
            .method(req.method().clone())
            .uri(self.target_uri(req.original_url()));
        if let Some(target) = builder.headers_mut() {
            target.extend(headers);
        }

        Ok(builder.body(Body::from(req.raw_body().clone()))?)
    }
}

impl Dispatch for UpstreamDispatch {
    fn dispatch(
        &self,
        req: EmbeddedRequest,
        res: EmbeddedResponse,
        next: Next,
    ) -> Result<(), DispatchError> {
        let upstream_req = self.build_request(&req)?;
        let client = self.client.clone();
        let limit = self.max_response_bytes;
        let target = upstream_req.uri().to_string();

        tracing::debug!(method = %req.method(), upstream = %target, "Forwarding to upstream");

        tokio::spawn(async move {
            match forward(client, upstream_req, limit).await {
                Ok((status, headers, body)) => {
                    tracing::debug!(upstream = %target, status = %status, "Upstream responded");
                    res.write_head(status, headers);
                    res.end_with(body);
                }
                Err(e) => {
                    tracing::error!(upstream = %target, error = %e, "Upstream error");
                    next.fail(e);
                }
            }
        });

        Ok(())
    }
}

async fn forward(
    client: Client<HttpConnector, Body>,
    req: Request<Body>,
    limit: usize,
) -> Result<(StatusCode, axum::http::HeaderMap, axum::body::Bytes), DispatchError> {
    let response: Response<Incoming> = client.request(req).await?;
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    let bytes = axum::body::to_bytes(Body::new(body), limit).await?;
    Ok((parts.status, parts.headers, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> UpstreamConfig {
        UpstreamConfig {
            enabled: true,
            base_url: base_url.to_string(),
            ..UpstreamConfig::default()
        }
    }

    #[tokio::test]
    async fn test_target_uri() {
        let upstream = UpstreamDispatch::new(&config("http://backend:5000")).unwrap();
        assert_eq!(
            upstream.target_uri("/api/orders?page=2"),
            "http://backend:5000/api/orders?page=2"
        );

        let upstream = UpstreamDispatch::new(&config("http://10.0.0.5/v1/")).unwrap();
        assert_eq!(upstream.target_uri("/api/cart"), "http://10.0.0.5:80/v1/api/cart");
    }

    #[tokio::test]
    async fn test_encoded_segments_survive_forwarding() {
        use crate::adapter::InboundRequest;
        use axum::body::Bytes;
        use axum::http::{HeaderMap, Method, Uri};

        let inbound = InboundRequest::new(
            Method::GET,
            Uri::from_static("/api/products/hair%20oil%2Fsoap?q=a%26b"),
            HeaderMap::new(),
            vec!["products".into(), "hair oil/soap".into()],
            Bytes::new(),
        );
        let req = EmbeddedRequest::from_inbound(inbound, "/api");
        assert_eq!(req.path(), "/api/products/hair oil/soap");

        let upstream = UpstreamDispatch::new(&config("http://backend:5000")).unwrap();
        let forwarded = upstream.build_request(&req).unwrap();
        assert_eq!(
            forwarded.uri().to_string(),
            "http://backend:5000/api/products/hair%20oil%2Fsoap?q=a%26b"
        );
    }

    #[tokio::test]
    async fn test_rejects_bad_base_urls() {
        assert!(matches!(
            UpstreamDispatch::new(&config("not a url")),
            Err(DispatchError::InvalidUpstream(_))
        ));
        assert!(matches!(
            UpstreamDispatch::new(&config("https://backend.example.com")),
            Err(DispatchError::InvalidUpstream(_))
        ));
    }
}
