//! The caching agent: install, activate and fetch handlers plus the
//! event-to-handler dispatch.

use std::sync::Arc;

use chrono::Utc;
use rwa_discount_core::{CacheName, FetchRequest, FetchResponse, RequestKey};
use tracing::{debug, error, info, instrument, warn};

use crate::config::AgentConfig;
use crate::error::{AgentError, NetworkError};
use crate::event::{
    ActivateReport, AgentEvent, Dispatched, EventOutcome, FetchOutcome, InstallReport, Lifetime,
    ResponseSource,
};
use crate::network::Network;
use crate::notification::{Notification, NotificationClick};
use crate::storage::CacheStorage;
use crate::strategy::{Route, is_static_asset, route};

/// Sync tag that triggers the background sync handler.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// One version of the caching agent.
///
/// Cheap to clone; clones share configuration, storage and network.
#[derive(Clone)]
pub struct CachingAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    config: AgentConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl std::fmt::Debug for CachingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingAgent")
            .field("cache_name", &self.inner.config.cache_name)
            .field("scope", &self.inner.config.scope.as_str())
            .finish_non_exhaustive()
    }
}

impl CachingAgent {
    /// Create an agent for one deployment.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            inner: Arc::new(AgentInner {
                config,
                storage,
                network,
            }),
        }
    }

    /// The agent's configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    /// The store this version owns.
    #[must_use]
    pub fn cache_name(&self) -> &CacheName {
        &self.inner.config.cache_name
    }

    /// Route an event to its handler.
    ///
    /// Install and activate complete all of their work before returning. A
    /// fetch returns its response as soon as it has one and leaves any store
    /// write attached to the returned [`Lifetime`].
    ///
    /// # Errors
    ///
    /// Returns `AgentError` if install or activate fails. Fetch, sync, push and
    /// notification-click never fail.
    pub async fn dispatch(&self, event: AgentEvent) -> Result<Dispatched, AgentError> {
        debug!(event = %event.kind(), cache = %self.cache_name(), "Dispatching event");
        match event {
            AgentEvent::Install => Ok(Dispatched::settled(EventOutcome::Installed(
                self.install().await?,
            ))),
            AgentEvent::Activate => Ok(Dispatched::settled(EventOutcome::Activated(
                self.activate().await?,
            ))),
            AgentEvent::Fetch(request) => {
                let mut lifetime = Lifetime::new();
                let outcome = self.fetch(&request, &mut lifetime).await;
                Ok(Dispatched {
                    outcome: EventOutcome::Fetch(outcome),
                    lifetime,
                })
            }
            AgentEvent::Sync { tag } => {
                let handled = self.sync(&tag);
                Ok(Dispatched::settled(EventOutcome::Synced { tag, handled }))
            }
            AgentEvent::Push { data } => Ok(Dispatched::settled(EventOutcome::Notify(
                self.push(data.as_deref()),
            ))),
            AgentEvent::NotificationClick { action } => Ok(Dispatched::settled(
                EventOutcome::NotificationClicked(NotificationClick::for_action(
                    action.as_deref(),
                )),
            )),
        }
    }

    /// Fetch every manifest resource and store them all in this version's store.
    ///
    /// Nothing is written unless every fetch succeeds with a 2xx status, so a
    /// failed install leaves no partial store behind.
    ///
    /// # Errors
    ///
    /// Returns `AgentError` naming the first resource that failed, or a
    /// storage error.
    #[instrument(skip(self), fields(cache = %self.cache_name()))]
    pub async fn install(&self) -> Result<InstallReport, AgentError> {
        let config = self.config();
        info!(resources = config.precache.len(), "Install event");

        let mut fetched: Vec<(RequestKey, FetchResponse)> = Vec::with_capacity(config.precache.len());
        for path in config.precache.iter() {
            let request = FetchRequest::get(config.resolve(path)?);
            let response = tokio::time::timeout(
                config.install_fetch_timeout,
                self.inner.network.fetch(&request),
            )
            .await
            .unwrap_or(Err(NetworkError::Timeout(config.install_fetch_timeout)))
            .map_err(|source| AgentError::Precache {
                path: path.to_string(),
                source,
            })?;

            if !response.is_success() {
                return Err(AgentError::PrecacheStatus {
                    path: path.to_string(),
                    status: response.status,
                });
            }
            fetched.push((request.cache_key(), response));
        }

        info!("Caching app shell");
        self.inner.storage.open(&config.cache_name).await?;
        self.inner
            .storage
            .put_all(&config.cache_name, fetched)
            .await?;

        Ok(InstallReport {
            cache_name: config.cache_name.clone(),
            cached: config.precache.iter().map(ToString::to_string).collect(),
            skip_waiting: true,
        })
    }

    /// Delete every store whose name differs from this version's.
    ///
    /// A store that fails to delete is logged and reported; it stays until the
    /// next activation.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Storage` if the store names cannot be listed.
    #[instrument(skip(self), fields(cache = %self.cache_name()))]
    pub async fn activate(&self) -> Result<ActivateReport, AgentError> {
        info!("Activate event");
        let current = self.cache_name();
        let names = self.inner.storage.keys().await?;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for name in names.into_iter().filter(|name| name != current) {
            info!(old_cache = %name, "Deleting old cache");
            match self.inner.storage.delete(&name).await {
                Ok(true) => deleted.push(name),
                Ok(false) => {}
                Err(e) => {
                    error!(old_cache = %name, error = %e, "Failed to delete old cache");
                    failed.push(name);
                }
            }
        }

        Ok(ActivateReport {
            deleted,
            failed,
            claim_clients: true,
        })
    }

    /// Answer one fetch according to its [`Route`].
    #[instrument(skip(self, request, lifetime), fields(method = %request.method, url = %request.url))]
    pub async fn fetch(&self, request: &FetchRequest, lifetime: &mut Lifetime) -> FetchOutcome {
        match route(request, self.config()) {
            Route::Passthrough => FetchOutcome::Passthrough,
            Route::NetworkFirst => self.network_first(request).await,
            Route::NetworkOnly => match self.inner.network.fetch(request).await {
                Ok(response) => FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                },
                Err(e) => {
                    debug!(error = %e, "Bypassed request failed");
                    FetchOutcome::NoResponse
                }
            },
            Route::CacheFirst => self.cache_first(request, lifetime).await,
        }
    }

    async fn network_first(&self, request: &FetchRequest) -> FetchOutcome {
        match self.inner.network.fetch(request).await {
            Ok(response) => FetchOutcome::Respond {
                response,
                source: ResponseSource::Network,
            },
            Err(e) => {
                debug!(error = %e, "Navigation failed, serving offline placeholder");
                match self.offline_placeholder().await {
                    Some(response) => FetchOutcome::Respond {
                        response,
                        source: ResponseSource::OfflinePlaceholder,
                    },
                    None => {
                        warn!("Offline placeholder missing from store");
                        FetchOutcome::NoResponse
                    }
                }
            }
        }
    }

    async fn offline_placeholder(&self) -> Option<FetchResponse> {
        let key = RequestKey::from_url(&self.config().resolve(&self.config().offline_url).ok()?);
        self.inner
            .storage
            .match_in(self.cache_name(), &key)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Store lookup failed");
                None
            })
    }

    async fn cache_first(&self, request: &FetchRequest, lifetime: &mut Lifetime) -> FetchOutcome {
        let key = request.cache_key();
        match self.inner.storage.match_in(self.cache_name(), &key).await {
            Ok(Some(response)) => {
                debug!("Serving from cache");
                return FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Store,
                };
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Store lookup failed, falling back to network"),
        }

        let response = match self.inner.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Network failed and no stored copy");
                return FetchOutcome::NoResponse;
            }
        };

        if response.is_cacheable() && is_static_asset(&request.url, &self.config().asset_extensions)
        {
            let storage = Arc::clone(&self.inner.storage);
            let cache_name = self.cache_name().clone();
            let copy = response.clone();
            lifetime.wait_until(async move {
                debug!(cache = %cache_name, key = %key, "Caching new resource");
                if let Err(e) = storage.put(&cache_name, key, copy).await {
                    warn!(cache = %cache_name, error = %e, "Failed to cache resource");
                }
            });
        }

        FetchOutcome::Respond {
            response,
            source: ResponseSource::Network,
        }
    }

    /// Handle a background sync. Only the `background-sync` tag is recognized,
    /// and it resolves immediately with nothing queued.
    #[must_use]
    pub fn sync(&self, tag: &str) -> bool {
        info!(tag, "Background sync");
        if tag == BACKGROUND_SYNC_TAG {
            debug!("Handling background sync");
            true
        } else {
            false
        }
    }

    /// Build the notification for a push.
    #[must_use]
    pub fn push(&self, data: Option<&str>) -> Notification {
        info!(has_payload = data.is_some(), "Push received");
        Notification::deals(&self.config().app_name, data, Utc::now())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::network::MemoryNetwork;
    use crate::storage::MemoryCacheStorage;
    use async_trait::async_trait;
    use rwa_discount_core::{Method, ResourceManifest};
    use std::time::Duration;
    use url::Url;

    fn origin() -> Url {
        Url::parse("http://localhost:3000/").unwrap()
    }

    fn shell_network() -> Arc<MemoryNetwork> {
        let network = Arc::new(MemoryNetwork::new(origin()));
        network.respond_ok("/", "<html>shell</html>");
        network.respond_ok("/offline.html", "<html>offline</html>");
        network.respond_ok("/manifest.json", "{}");
        network.respond_ok("/icons/icon-192x192.png", vec![0_u8; 4]);
        network.respond_ok("/icons/icon-512x512.png", vec![0_u8; 8]);
        network.respond_ok("/assets/app.js", "console.log('deals')");
        network.respond_ok("/api/ping", "pong");
        network.respond_ok("https://project.supabase.co/rest/v1/deals", "[]");
        network
    }

    fn agent_with(
        storage: Arc<dyn CacheStorage>,
        network: Arc<MemoryNetwork>,
    ) -> CachingAgent {
        CachingAgent::new(AgentConfig::default().with_scope(origin()), storage, network)
    }

    fn url(path: &str) -> Url {
        origin().join(path).unwrap()
    }

    async fn installed() -> (CachingAgent, Arc<MemoryCacheStorage>, Arc<MemoryNetwork>) {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = shell_network();
        let agent = agent_with(storage.clone(), network.clone());
        agent.install().await.unwrap();
        (agent, storage, network)
    }

    /// Storage whose `put` always fails.
    struct ReadOnlyStorage(MemoryCacheStorage);

    #[async_trait]
    impl CacheStorage for ReadOnlyStorage {
        async fn open(&self, name: &CacheName) -> Result<(), StorageError> {
            self.0.open(name).await
        }
        async fn has(&self, name: &CacheName) -> Result<bool, StorageError> {
            self.0.has(name).await
        }
        async fn keys(&self) -> Result<Vec<CacheName>, StorageError> {
            self.0.keys().await
        }
        async fn delete(&self, _name: &CacheName) -> Result<bool, StorageError> {
            Err(StorageError::Unavailable("quota".to_string()))
        }
        async fn match_in(
            &self,
            name: &CacheName,
            key: &RequestKey,
        ) -> Result<Option<FetchResponse>, StorageError> {
            self.0.match_in(name, key).await
        }
        async fn put(
            &self,
            _name: &CacheName,
            _key: RequestKey,
            _response: FetchResponse,
        ) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        async fn put_all(
            &self,
            name: &CacheName,
            entries: Vec<(RequestKey, FetchResponse)>,
        ) -> Result<(), StorageError> {
            self.0.put_all(name, entries).await
        }
        async fn entries(&self, name: &CacheName) -> Result<Vec<RequestKey>, StorageError> {
            self.0.entries(name).await
        }
    }

    // -------------------------------------------------------------------------
    // install
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_install_stores_every_manifest_resource() {
        let (agent, storage, _) = installed().await;
        let entries = storage.entries(agent.cache_name()).await.unwrap();
        assert_eq!(entries.len(), 4);
        for path in ResourceManifest::v2().iter() {
            assert!(
                entries.contains(&RequestKey::from_url(&url(path))),
                "{path} missing"
            );
        }
    }

    #[tokio::test]
    async fn test_install_report_requests_skip_waiting() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let agent = agent_with(storage, shell_network());
        let report = agent.install().await.unwrap();
        assert!(report.skip_waiting);
        assert_eq!(report.cache_name.as_str(), "app-cache-v2");
        assert_eq!(report.cached.len(), 4);
    }

    #[tokio::test]
    async fn test_install_fails_if_any_resource_fails() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = shell_network();
        network.fail(
            "/icons/icon-512x512.png",
            NetworkError::Offline("connection reset".to_string()),
        );
        let agent = agent_with(storage.clone(), network);

        let err = agent.install().await.unwrap_err();
        assert!(matches!(err, AgentError::Precache { ref path, .. } if path == "/icons/icon-512x512.png"));
        assert!(!storage.has(agent.cache_name()).await.unwrap());
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = shell_network();
        network.respond("/manifest.json", FetchResponse::new(500, "boom"));
        let agent = agent_with(storage.clone(), network);

        let err = agent.install().await.unwrap_err();
        assert!(matches!(err, AgentError::PrecacheStatus { status: 500, .. }));
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_failure_leaves_previous_store_untouched() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = shell_network();
        let v1 = CacheName::parse("app-cache-v1").unwrap();
        let v1_agent = CachingAgent::new(
            AgentConfig::default()
                .with_scope(origin())
                .with_cache_name(v1.clone())
                .with_precache(ResourceManifest::v1()),
            storage.clone(),
            network.clone(),
        );
        v1_agent.install().await.unwrap();

        network.fail("/offline.html", NetworkError::Offline("down".to_string()));
        let v2_agent = agent_with(storage.clone(), network);
        assert!(v2_agent.install().await.is_err());

        assert_eq!(storage.keys().await.unwrap(), vec![v1.clone()]);
        assert_eq!(storage.entries(&v1).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_install_times_out() {
        struct Hang;
        #[async_trait]
        impl Network for Hang {
            async fn fetch(&self, _: &FetchRequest) -> Result<FetchResponse, NetworkError> {
                std::future::pending().await
            }
        }

        let storage = Arc::new(MemoryCacheStorage::new());
        let agent = CachingAgent::new(
            AgentConfig::default().with_install_fetch_timeout(Duration::from_millis(20)),
            storage,
            Arc::new(Hang),
        );
        let err = agent.install().await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Precache {
                source: NetworkError::Timeout(_),
                ..
            }
        ));
    }

    // -------------------------------------------------------------------------
    // activate
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_activate_keeps_only_current_store() {
        let (agent, storage, _) = installed().await;
        for old in ["app-cache-v1", "rwadiscount-v1"] {
            storage.open(&CacheName::parse(old).unwrap()).await.unwrap();
        }

        let report = agent.activate().await.unwrap();
        assert_eq!(report.deleted.len(), 2);
        assert!(report.failed.is_empty());
        assert!(report.claim_clients);
        assert_eq!(storage.keys().await.unwrap(), vec![agent.cache_name().clone()]);
    }

    #[tokio::test]
    async fn test_activate_reports_failed_deletions() {
        let storage = Arc::new(ReadOnlyStorage(MemoryCacheStorage::new()));
        storage.open(&CacheName::parse("app-cache-v1").unwrap()).await.unwrap();
        let agent = agent_with(storage.clone(), shell_network());

        let report = agent.activate().await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.failed, vec![CacheName::parse("app-cache-v1").unwrap()]);
    }

    // -------------------------------------------------------------------------
    // fetch
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_non_get_is_not_intercepted() {
        let (agent, _, network) = installed().await;
        let before = network.requests().len();
        let request = FetchRequest::get(url("/assets/app.js")).with_method(Method::Post);

        let outcome = agent.fetch(&request, &mut Lifetime::new()).await;
        assert_eq!(outcome, FetchOutcome::Passthrough);
        assert_eq!(network.requests().len(), before);
    }

    #[tokio::test]
    async fn test_navigation_prefers_network_even_when_stored() {
        let (agent, storage, network) = installed().await;
        storage
            .put(
                agent.cache_name(),
                RequestKey::from_url(&url("/")),
                FetchResponse::new(200, "<html>stale</html>"),
            )
            .await
            .unwrap();

        let outcome = agent
            .fetch(&FetchRequest::navigate(url("/")), &mut Lifetime::new())
            .await;
        let FetchOutcome::Respond { response, source } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "<html>shell</html>");
        assert_eq!(network.calls_to("/"), 1);
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_placeholder() {
        let (agent, _, network) = installed().await;
        network.fail("/deals/42", NetworkError::Offline("no route".to_string()));

        let outcome = agent
            .fetch(&FetchRequest::navigate(url("/deals/42")), &mut Lifetime::new())
            .await;
        let FetchOutcome::Respond { response, source } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(source, ResponseSource::OfflinePlaceholder);
        assert_eq!(response.text(), "<html>offline</html>");
    }

    #[tokio::test]
    async fn test_navigation_offline_without_placeholder_has_no_response() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = shell_network();
        network.fail("/", NetworkError::Offline("no route".to_string()));
        let agent = agent_with(storage, network);

        let outcome = agent
            .fetch(&FetchRequest::navigate(url("/")), &mut Lifetime::new())
            .await;
        assert_eq!(outcome, FetchOutcome::NoResponse);
    }

    #[tokio::test]
    async fn test_backend_always_uses_network() {
        let (agent, storage, network) = installed().await;
        let backend = Url::parse("https://project.supabase.co/rest/v1/deals").unwrap();
        storage
            .put(
                agent.cache_name(),
                RequestKey::from_url(&backend),
                FetchResponse::new(200, "[\"stale\"]"),
            )
            .await
            .unwrap();

        let outcome = agent
            .fetch(&FetchRequest::get(backend.clone()), &mut Lifetime::new())
            .await;
        let FetchOutcome::Respond { response, source } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "[]");

        network.fail(backend.as_str(), NetworkError::Offline("down".to_string()));
        let outcome = agent
            .fetch(&FetchRequest::get(backend), &mut Lifetime::new())
            .await;
        assert_eq!(outcome, FetchOutcome::NoResponse);
    }

    #[tokio::test]
    async fn test_stored_asset_served_without_network() {
        let (agent, _, network) = installed().await;
        let before = network.requests().len();

        let outcome = agent
            .fetch(
                &FetchRequest::get(url("/icons/icon-192x192.png")),
                &mut Lifetime::new(),
            )
            .await;
        assert!(matches!(
            outcome,
            FetchOutcome::Respond {
                source: ResponseSource::Store,
                ..
            }
        ));
        assert_eq!(network.requests().len(), before);
    }

    #[tokio::test]
    async fn test_asset_written_back_then_served_from_store() {
        let (agent, storage, network) = installed().await;
        let request = FetchRequest::get(url("/assets/app.js"));

        let mut lifetime = Lifetime::new();
        let first = agent.fetch(&request, &mut lifetime).await;
        assert!(matches!(
            first,
            FetchOutcome::Respond {
                source: ResponseSource::Network,
                ..
            }
        ));
        assert!(!lifetime.is_empty());
        lifetime.settled().await;

        assert!(
            storage
                .match_in(agent.cache_name(), &request.cache_key())
                .await
                .unwrap()
                .is_some()
        );

        let second = agent.fetch(&request, &mut Lifetime::new()).await;
        let FetchOutcome::Respond { response, source } = second else {
            panic!("expected a response");
        };
        assert_eq!(source, ResponseSource::Store);
        assert_eq!(response.text(), "console.log('deals')");
        assert_eq!(network.calls_to("/assets/app.js"), 1);
    }

    #[tokio::test]
    async fn test_non_asset_not_written_back() {
        let (agent, storage, _) = installed().await;
        let request = FetchRequest::get(url("/api/ping"));

        let mut lifetime = Lifetime::new();
        agent.fetch(&request, &mut lifetime).await;
        assert!(lifetime.is_empty());
        assert!(
            storage
                .match_in(agent.cache_name(), &request.cache_key())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_error_status_not_written_back() {
        let (agent, _, network) = installed().await;
        network.respond("/assets/broken.css", FetchResponse::new(503, ""));

        let mut lifetime = Lifetime::new();
        let outcome = agent
            .fetch(&FetchRequest::get(url("/assets/broken.css")), &mut lifetime)
            .await;
        assert!(lifetime.is_empty());
        let FetchOutcome::Respond { response, .. } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_cross_origin_asset_not_written_back() {
        let (agent, _, network) = installed().await;
        network.respond_ok("https://fonts.example.com/inter.woff2", vec![1_u8, 2, 3]);

        let mut lifetime = Lifetime::new();
        agent
            .fetch(
                &FetchRequest::get(Url::parse("https://fonts.example.com/inter.woff2").unwrap()),
                &mut lifetime,
            )
            .await;
        assert!(lifetime.is_empty());
    }

    #[tokio::test]
    async fn test_asset_offline_without_copy_has_no_response() {
        let (agent, _, network) = installed().await;
        network.fail("/assets/late.js", NetworkError::Offline("down".to_string()));

        let outcome = agent
            .fetch(&FetchRequest::get(url("/assets/late.js")), &mut Lifetime::new())
            .await;
        assert_eq!(outcome, FetchOutcome::NoResponse);
    }

    #[tokio::test]
    async fn test_store_write_failure_is_swallowed() {
        let storage = Arc::new(ReadOnlyStorage(MemoryCacheStorage::new()));
        let network = shell_network();
        let agent = agent_with(storage.clone(), network.clone());
        agent.install().await.unwrap();

        let request = FetchRequest::get(url("/assets/app.js"));
        let mut lifetime = Lifetime::new();
        let outcome = agent.fetch(&request, &mut lifetime).await;
        lifetime.settled().await;

        let FetchOutcome::Respond { response, source } = outcome else {
            panic!("expected a response");
        };
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.status, 200);

        // Nothing was stored, so the next request goes to the network again.
        agent.fetch(&request, &mut Lifetime::new()).await;
        assert_eq!(network.calls_to("/assets/app.js"), 2);
    }

    // -------------------------------------------------------------------------
    // dispatch
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dispatch_routes_events() {
        let (agent, _, _) = installed().await;

        let synced = agent
            .dispatch(AgentEvent::Sync {
                tag: BACKGROUND_SYNC_TAG.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            synced.outcome,
            EventOutcome::Synced {
                tag: BACKGROUND_SYNC_TAG.to_string(),
                handled: true
            }
        );

        let other = agent
            .dispatch(AgentEvent::Sync {
                tag: "unknown".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(other.outcome, EventOutcome::Synced { handled: false, .. }));

        let pushed = agent
            .dispatch(AgentEvent::Push { data: None })
            .await
            .unwrap();
        let EventOutcome::Notify(notification) = pushed.outcome else {
            panic!("expected a notification");
        };
        assert_eq!(notification.title, "RwaDiscount");

        let clicked = agent
            .dispatch(AgentEvent::NotificationClick {
                action: Some("explore".to_string()),
            })
            .await
            .unwrap();
        assert!(matches!(
            clicked.outcome,
            EventOutcome::NotificationClicked(NotificationClick { open_window: Some(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_dispatch_install_error_propagates() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = shell_network();
        network.respond("/offline.html", FetchResponse::new(404, ""));
        let agent = agent_with(storage, network);

        assert!(agent.dispatch(AgentEvent::Install).await.is_err());
    }
}
