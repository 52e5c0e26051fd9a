//! CORS preflight handling.
//!
//! OPTIONS requests on the API mount never reach the embedded framework;
//! they are answered here with the configured allow lists.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::adapter::{OutboundBody, OutboundResponse};
use crate::config::CorsConfig;

/// 200 response carrying the preflight headers.
pub fn preflight(cors: &CorsConfig) -> OutboundResponse {
    let mut headers = HeaderMap::new();
    insert(&mut headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, &cors.allow_origin);
    insert(
        &mut headers,
        header::ACCESS_CONTROL_ALLOW_METHODS,
        &cors.allow_methods.join(", "),
    );
    insert(
        &mut headers,
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        &cors.allow_headers.join(", "),
    );
    if let Some(max_age) = cors.max_age_secs {
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
    }

    OutboundResponse::new(StatusCode::OK, headers, OutboundBody::Empty)
}

fn insert(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => tracing::warn!(header = %name, value, "Skipping invalid CORS header value"),
    }
}
