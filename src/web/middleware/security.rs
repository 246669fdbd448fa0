//! Security response headers.

use axum::{
    body::Body,
    http::{header, header::HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Add security headers to every response.
///
/// Pages are per-member documents, so nothing is cached unless the handler
/// set its own `Cache-Control`. HSTS is left to the reverse proxy.
pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("same-origin"),
    );

    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        );
    }

    response
}
