//! Request id middleware.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request id that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Uses the caller's `X-Request-ID` when it is sane, otherwise a fresh UUID.
fn request_id_from(req: &Request<Body>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Tags every request with an id, runs it inside a span carrying that id and
/// echoes the id on the response.
pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from(&req);
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let start = std::time::Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/health");
        if let Some(value) = header {
            builder = builder.header(REQUEST_ID_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_request_id_from_header() {
        assert_eq!(request_id_from(&request_with(Some("abc-123"))), "abc-123");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let id = request_id_from(&request_with(None));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_request_id_generated_when_blank_or_oversized() {
        let blank = request_id_from(&request_with(Some("   ")));
        assert!(Uuid::parse_str(&blank).is_ok());

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = request_id_from(&request_with(Some(&long)));
        assert!(Uuid::parse_str(&replaced).is_ok());
    }
}
