//! `rwa-discount-server`: the RwaDiscount origin.
//!
//! Serves the app shell and everything the caching agent precaches, plus the
//! agent descriptor hosts poll for new deployments.

#![cfg_attr(not(test), forbid(unsafe_code))]

use rwa_discount_server::config::ServerConfig;
use rwa_discount_server::state::AppState;
use rwa_discount_server::{app, telemetry};
use tracing::info;

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Sentry before tracing, so the bridge layer has a client
    let _sentry = telemetry::init_sentry(&config);
    telemetry::init_tracing();

    let state = AppState::new(config.clone()).expect("Failed to serialize agent descriptor");
    info!(
        cache = %state.descriptor().cache_name,
        precache = state.descriptor().precache.len(),
        bypass = ?state.descriptor().bypass_domains,
        "Publishing caching agent"
    );

    let router = app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    info!("Origin listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        "ctrl-c"
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        "sigterm"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let signal = tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    };
    info!(signal, "Shutting down");
}
