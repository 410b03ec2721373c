//! The network seam.
//!
//! The agent never talks to `reqwest` directly; it goes through [`Network`] so
//! the same handlers run against a live origin ([`HttpNetwork`]), an
//! in-process origin ([`MemoryNetwork`]) or either of those behind a
//! connectivity switch ([`ConnectivityGate`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rwa_discount_core::{Connectivity, FetchRequest, FetchResponse, RequestMode, ResponseType};
use tokio::sync::watch;
use tracing::{debug, instrument};
use url::Url;

use crate::error::NetworkError;

/// Default timeout for a single HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request.
    ///
    /// A returned `Ok` may carry any HTTP status; `Err` means no response was
    /// produced at all.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError>;
}

#[async_trait]
impl<T: Network + ?Sized> Network for Arc<T> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        (**self).fetch(request).await
    }
}

// =============================================================================
// HttpNetwork
// =============================================================================

/// `reqwest`-backed network for a live origin.
///
/// Responses are tagged with [`response_type`] relative to `origin`.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: Option<Url>,
    timeout: Duration,
}

impl HttpNetwork {
    /// Create a client for pages served from `origin`.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(origin: Option<Url>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rwa-discount-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            origin,
            timeout,
        })
    }

}

/// How a page on `origin` sees a response from `url`: same-origin is
/// [`ResponseType::Basic`], cross-origin is [`ResponseType::Cors`] unless the
/// request was `no-cors`, which makes it [`ResponseType::Opaque`]. Without an
/// origin everything counts as same-origin.
#[must_use]
pub fn response_type(origin: Option<&Url>, request: &FetchRequest, url: &Url) -> ResponseType {
    match origin {
        Some(origin) if origin.origin() != url.origin() => {
            if request.mode == RequestMode::NoCors {
                ResponseType::Opaque
            } else {
                ResponseType::Cors
            }
        }
        _ => ResponseType::Basic,
    }
}

#[async_trait]
impl Network for HttpNetwork {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let timeout = self.timeout;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                NetworkError::Timeout(timeout)
            } else {
                NetworkError::from(e)
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_err)?;

        debug!(status, bytes = body.len(), "Network response");

        Ok(FetchResponse {
            status,
            headers,
            body,
            response_type: response_type(self.origin.as_ref(), request, &url),
            url: Some(url),
        })
    }
}

// =============================================================================
// MemoryNetwork
// =============================================================================

/// An in-process origin with scripted responses.
///
/// Unknown URLs answer 404. Every request is recorded so callers can tell a
/// store hit (no network call) from a network fetch.
#[derive(Debug)]
pub struct MemoryNetwork {
    origin: Url,
    routes: Mutex<HashMap<String, Result<FetchResponse, NetworkError>>>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl MemoryNetwork {
    /// Create an empty origin.
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The origin root.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    fn key(&self, path_or_url: &str) -> String {
        Url::parse(path_or_url)
            .or_else(|_| self.origin.join(path_or_url))
            .map_or_else(|_| path_or_url.to_string(), String::from)
    }

    /// Serve `response` for a path (relative to the origin) or absolute URL.
    pub fn respond(&self, path_or_url: &str, response: FetchResponse) {
        let key = self.key(path_or_url);
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Ok(response));
    }

    /// Serve a 200 response with `body` for a path or URL.
    pub fn respond_ok(&self, path_or_url: &str, body: impl Into<bytes::Bytes>) {
        self.respond(path_or_url, FetchResponse::new(200, body));
    }

    /// Make a path or URL fail with a network error.
    pub fn fail(&self, path_or_url: &str, error: NetworkError) {
        let key = self.key(path_or_url);
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Err(error));
    }

    /// Number of requests made for a path or URL.
    #[must_use]
    pub fn calls_to(&self, path_or_url: &str) -> usize {
        let key = self.key(path_or_url);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.url.as_str() == key)
            .count()
    }

    /// Every request seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let route = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request.url.as_str())
            .cloned();

        let response_type = response_type(Some(&self.origin), request, &request.url);

        match route {
            Some(Ok(response)) => Ok(response
                .with_url(request.url.clone())
                .with_type(response_type)),
            Some(Err(err)) => Err(err),
            None => Ok(FetchResponse::new(404, "Not Found")
                .with_url(request.url.clone())
                .with_type(response_type)),
        }
    }
}

// =============================================================================
// ConnectivityGate
// =============================================================================

/// Wraps a network with an online/offline switch.
///
/// While offline every fetch fails with [`NetworkError::Offline`]. Changes are
/// published on a `watch` channel so pages can observe connectivity.
#[derive(Debug)]
pub struct ConnectivityGate<N> {
    inner: N,
    state: watch::Sender<Connectivity>,
}

impl<N: Network> ConnectivityGate<N> {
    /// Wrap `inner`, starting online.
    #[must_use]
    pub fn new(inner: N) -> Self {
        let (state, _) = watch::channel(Connectivity::Online);
        Self { inner, state }
    }

    /// Switch connectivity. Subscribers are only notified on an actual change.
    pub fn set_connectivity(&self, connectivity: Connectivity) {
        self.state.send_if_modified(|current| {
            if *current == connectivity {
                false
            } else {
                *current = connectivity;
                true
            }
        });
    }

    /// Current connectivity.
    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Observe connectivity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// The wrapped network.
    #[must_use]
    pub const fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait]
impl<N: Network> Network for ConnectivityGate<N> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        if !self.connectivity().is_online() {
            return Err(NetworkError::Offline(format!(
                "offline while fetching {}",
                request.url
            )));
        }
        self.inner.fetch(request).await
    }
}
