//! CORS configuration.
//!
//! The session lives in a cookie, so cross-origin callers only get
//! credentials when their origin is listed explicitly.

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Build the CORS layer for the configured origins.
///
/// With no usable origin the layer allows any origin without credentials.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_headers(Any)
            .allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_headers([CONTENT_TYPE, ACCEPT])
            .allow_credentials(true)
            .allow_origin(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::util::ServiceExt;

    async fn handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_listed_origin_gets_credentials() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(create_cors_layer(&["http://localhost:3000".to_string()]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get("access-control-allow-credentials").unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_no_origins_is_permissive() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(create_cors_layer(&["\n".to_string()]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Origin", "http://elsewhere.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert!(headers.get("access-control-allow-credentials").is_none());
    }
}
