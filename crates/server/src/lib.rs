//! RwaDiscount origin server.
//!
//! Serves the app shell, the offline placeholder, the web app manifest, the
//! icons and the caching agent descriptor. Everything a caching agent
//! precaches comes from here.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the application router.
///
/// Sentry layers are added by the binary so tests run without a client.
pub fn app(state: AppState) -> Router {
    let icons = ServeDir::new(state.config().static_dir.join("icons"));

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/icons", icons)
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use rwa_discount_core::AgentDescriptor;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = ServerConfig {
            static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
            ..ServerConfig::default()
        };
        app(AppState::new(config).unwrap())
    }

    async fn get(path: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, b"ok");
    }

    #[tokio::test]
    async fn test_shell_links_manifest() {
        let response = get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body(response).await).unwrap();
        assert!(html.contains(r#"<link rel="manifest" href="/manifest.json">"#));
        assert!(html.contains(r#"id="root""#));
    }

    #[tokio::test]
    async fn test_offline_page() {
        let response = get("/offline.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body(response).await).unwrap();
        assert!(html.contains("You're offline") || html.contains("You&#x27;re offline"));
    }

    #[tokio::test]
    async fn test_web_app_manifest() {
        let response = get("/manifest.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/manifest+json"
        );
        let manifest: serde_json::Value = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(manifest["display"], "standalone");
        assert_eq!(manifest["start_url"], "/");
        assert_eq!(manifest["short_name"], "RwaDiscount");
        assert_eq!(manifest["icons"][0]["src"], "/icons/icon-192x192.png");
        assert_eq!(manifest["icons"][1]["sizes"], "512x512");
    }

    #[tokio::test]
    async fn test_agent_descriptor_headers_and_body() {
        let response = get("/agent.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["service-worker-allowed"], "/");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let descriptor = AgentDescriptor::from_slice(&body(response).await).unwrap();
        assert_eq!(descriptor.cache_name.as_str(), "app-cache-v2");
        assert_eq!(descriptor.precache.len(), 4);
    }

    #[tokio::test]
    async fn test_descriptor_bytes_are_stable() {
        let first = body(get("/agent.json").await).await;
        let second = body(get("/agent.json").await).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_icons_are_served() {
        let response = get("/icons/icon-192x192.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let response = get("/deals/does-not-exist").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = test_app()
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");

        let generated = get("/health").await;
        assert!(generated.headers().contains_key("x-request-id"));
    }
}
