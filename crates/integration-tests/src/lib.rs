//! Integration test support for RwaDiscount.
//!
//! [`TestServer`] runs the real origin server on an ephemeral port and can
//! switch deployments in place, so a host keeps the same origin (and scope)
//! across agent versions. [`Browser`] is an agent host wired to that origin
//! through a connectivity switch.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rwa-discount-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use axum::Router;
use axum::extract::Request;
use axum::response::IntoResponse;
use rwa_discount_agent::{
    AgentHost, ConnectivityGate, DEFAULT_HTTP_TIMEOUT, HttpNetwork, MemoryCacheStorage,
};
use rwa_discount_core::{CacheName, ResourceManifest};
use rwa_discount_server::config::ServerConfig;
use rwa_discount_server::state::AppState;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use url::Url;

/// Server config for one deployment, serving this workspace's icons.
///
/// # Panics
///
/// Panics if `cache_name` is not a valid store name.
#[must_use]
pub fn deployment(cache_name: &str, precache: ResourceManifest) -> ServerConfig {
    ServerConfig {
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../server/static"),
        cache_version: CacheName::parse(cache_name).expect("valid cache name"),
        precache,
        ..ServerConfig::default()
    }
}

/// The origin server, running in the background.
pub struct TestServer {
    origin: Url,
    current: Arc<RwLock<Router>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start serving `config` on `127.0.0.1` at a free port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(config: ServerConfig) -> Self {
        let current = Arc::new(RwLock::new(build(config)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");
        let origin = Url::parse(&format!("http://{addr}/")).expect("valid origin");

        let shared = Arc::clone(&current);
        let front = Router::new().fallback(move |request: Request| {
            let app = shared
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            async move {
                match app.oneshot(request).await {
                    Ok(response) => response.into_response(),
                    Err(never) => match never {},
                }
            }
        });

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, front).await;
        });

        Self {
            origin,
            current,
            task,
        }
    }

    /// Replace the running deployment.
    pub fn deploy(&self, config: ServerConfig) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = build(config);
    }

    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL for `path` on this origin.
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be joined.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.origin.join(path).expect("valid path")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn build(config: ServerConfig) -> Router {
    rwa_discount_server::app(AppState::new(config).expect("descriptor serializes"))
}

/// An agent host talking to a live origin over HTTP.
pub struct Browser {
    pub host: AgentHost,
    pub gate: Arc<ConnectivityGate<HttpNetwork>>,
    pub storage: Arc<MemoryCacheStorage>,
}

impl Browser {
    /// A fresh browser profile for pages from `origin`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(origin: &Url) -> Self {
        let network = HttpNetwork::new(Some(origin.clone()), DEFAULT_HTTP_TIMEOUT)
            .expect("Failed to create HTTP client");
        let gate = Arc::new(ConnectivityGate::new(network));
        let storage = Arc::new(MemoryCacheStorage::new());
        let host = AgentHost::new(storage.clone(), gate.clone());
        Self {
            host,
            gate,
            storage,
        }
    }
}
