//! Express-style router used as the embedded application.
//!
//! # Responsibilities
//! - Hold ordered routes (method, path pattern, handler)
//! - Dispatch to the first matching route with captured params
//! - Hand unmatched requests to a fallback, or report them unhandled
//!
//! # Design Decisions
//! - Routes are fixed once the app is built
//! - HEAD requests match GET routes
//! - Routing looks at the normalized path only, never the query string

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use super::pattern::PathPattern;
use super::{Dispatch, DispatchError};
use crate::adapter::{EmbeddedRequest, EmbeddedResponse, Next};

struct Route {
    method: Option<Method>,
    pattern: PathPattern,
    handler: Arc<dyn Dispatch>,
}

impl Route {
    fn accepts(&self, method: &Method) -> bool {
        match &self.method {
            None => true,
            Some(expected) => {
                expected == method || (*method == Method::HEAD && *expected == Method::GET)
            }
        }
    }
}

/// Embedded application: routes plus an optional fallback.
#[derive(Default)]
pub struct App {
    routes: Vec<Route>,
    fallback: Option<Arc<dyn Dispatch>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. `None` matches every method.
    pub fn route(mut self, method: Option<Method>, pattern: &str, handler: Arc<dyn Dispatch>) -> Self {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            handler,
        });
        self
    }

    pub fn get<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Some(Method::GET), pattern, Arc::new(handler))
    }

    pub fn post<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Some(Method::POST), pattern, Arc::new(handler))
    }

    pub fn put<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Some(Method::PUT), pattern, Arc::new(handler))
    }

    pub fn patch<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Some(Method::PATCH), pattern, Arc::new(handler))
    }

    pub fn delete<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(Some(Method::DELETE), pattern, Arc::new(handler))
    }

    pub fn any<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.route(None, pattern, Arc::new(handler))
    }

    /// Dispatch target for requests no route matched.
    pub fn fallback(mut self, fallback: impl Dispatch) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Dispatch for App {
    fn dispatch(
        &self,
        mut req: EmbeddedRequest,
        res: EmbeddedResponse,
        next: Next,
    ) -> Result<(), DispatchError> {
        let method = req.method().clone();
        for route in self.routes.iter().filter(|r| r.accepts(&method)) {
            if let Some(params) = route.pattern.matches(req.path()) {
                tracing::trace!(pattern = route.pattern.as_str(), path = req.path(), "Route matched");
                req.set_params(params);
                return route.handler.dispatch(req, res, next);
            }
        }

        match &self.fallback {
            Some(fallback) => fallback.dispatch(req, res, next),
            None => {
                tracing::debug!(method = %req.method(), path = req.path(), "No embedded route matched");
                next.finish();
                Ok(())
            }
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .routes
            .iter()
            .map(|r| match &r.method {
                Some(m) => format!("{m} {}", r.pattern.as_str()),
                None => format!("* {}", r.pattern.as_str()),
            })
            .collect();
        f.debug_struct("App")
            .field("routes", &routes)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Adapter;
    use crate::adapter::InboundRequest;
    use crate::config::{AdapterConfig, CorsConfig};
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use serde_json::json;

    fn storefront() -> App {
        App::new()
            .get("/api/products/:id", |req, res, _next| {
                res.json(&json!({
                    "id": req.param("id"),
                    "active": req.query_param("active"),
                }))
            })
            .post("/api/orders", |req, res, _next| {
                res.status(201).json(&json!({"received": req.body()}))
            })
            .delete("/api/coupons/:code", |req, res, _next| {
                res.status(404)
                    .json(&json!({"success": false, "message": format!("Coupon {} not found", req.param("code").unwrap_or_default())}))
            })
            .any("/api/admin/*", |req, res, _next| {
                res.json(&json!({"rest": req.param("*"), "method": req.method().as_str()}))
            })
    }

    async fn call(app: App, method: Method, uri: &'static str, body: &'static str) -> crate::adapter::OutboundResponse {
        let adapter = Adapter::new(&AdapterConfig::default(), &CorsConfig::default(), Arc::new(app));
        let path = Uri::from_static(uri).path().to_string();
        let segments = path
            .trim_start_matches("/api/")
            .split('/')
            .map(str::to_owned)
            .collect();
        let inbound = InboundRequest::new(
            method,
            Uri::from_static(uri),
            HeaderMap::new(),
            segments,
            Bytes::from_static(body.as_bytes()),
        );
        adapter.handle(inbound).await
    }

    #[tokio::test]
    async fn test_param_route() {
        let out = call(storefront(), Method::GET, "/api/products/123?active=true", "").await;
        assert_eq!(out.status(), StatusCode::OK);
        assert_eq!(out.json(), Some(&json!({"id": "123", "active": "true"})));
    }

    #[tokio::test]
    async fn test_method_mismatch_is_unhandled() {
        let out = call(storefront(), Method::PUT, "/api/products/123", "{}").await;
        assert_eq!(out.status(), StatusCode::NOT_FOUND);
        assert_eq!(out.json(), Some(&json!({"success": false, "error": "Not found"})));
    }

    #[tokio::test]
    async fn test_post_body() {
        let out = call(storefront(), Method::POST, "/api/orders", r#"{"items":[{"sku":"SOAP-1","qty":2}]}"#).await;
        assert_eq!(out.status(), StatusCode::CREATED);
        assert_eq!(
            out.json(),
            Some(&json!({"received": {"items": [{"sku": "SOAP-1", "qty": 2}]}}))
        );
    }

    #[tokio::test]
    async fn test_not_found_payload() {
        let out = call(storefront(), Method::DELETE, "/api/coupons/SUMMER10", "").await;
        assert_eq!(out.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            out.json(),
            Some(&json!({"success": false, "message": "Coupon SUMMER10 not found"}))
        );
    }

    #[tokio::test]
    async fn test_wildcard_any_method() {
        let out = call(storefront(), Method::PATCH, "/api/admin/products/9", "{}").await;
        assert_eq!(out.json(), Some(&json!({"rest": "products/9", "method": "PATCH"})));
    }

    #[tokio::test]
    async fn test_head_matches_get() {
        let out = call(storefront(), Method::HEAD, "/api/products/5", "").await;
        assert_eq!(out.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fallback_receives_unmatched() {
        let app = storefront().fallback(|req: EmbeddedRequest, res: EmbeddedResponse, _next: Next| {
            res.status(202).json(&json!({"forwarded": req.url()}))
        });
        assert_eq!(app.route_count(), 4);
        let out = call(app, Method::GET, "/api/combos?page=2", "").await;
        assert_eq!(out.status(), StatusCode::ACCEPTED);
        assert_eq!(out.json(), Some(&json!({"forwarded": "/api/combos?page=2"})));
    }
}
