//! The in-process host that plays the browser's part for a single scope.
//!
//! The host owns the registration, detects new agent versions by comparing the
//! SHA-256 digest of the descriptor bytes, runs install and activate one at a
//! time, tracks which pages each version controls, and routes page fetches
//! through the controlling agent.
//!
//! Lifecycle events are serialized by a single async mutex. Fetch events run
//! concurrently, but never reach a version before its activation settles;
//! their background work is tracked until it finishes or [`AgentHost::idle`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rwa_discount_core::{
    AgentDescriptor, CacheName, ClientId, FetchRequest, FetchResponse, LifecycleEvent, WorkerId,
    WorkerState,
};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::agent::CachingAgent;
use crate::config::{AgentConfig, DEFAULT_INSTALL_FETCH_TIMEOUT};
use crate::error::{HostError, NetworkError};
use crate::event::{AgentEvent, EventOutcome, FetchOutcome, Lifetime, ResponseSource};
use crate::network::Network;
use crate::storage::CacheStorage;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Host tuning.
#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    /// Per-resource timeout applied to every installed version.
    pub install_fetch_timeout: Duration,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            install_fetch_timeout: DEFAULT_INSTALL_FETCH_TIMEOUT,
        }
    }
}

/// Signals a page can observe on its registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEvent {
    /// A new version started installing.
    UpdateFound { worker: WorkerId },
    /// A version changed state. `active` is the version controlling pages at
    /// the moment of the change.
    StateChange {
        worker: WorkerId,
        state: WorkerState,
        active: Option<WorkerId>,
    },
    /// Open pages are now controlled by `worker`.
    ControllerChange { worker: WorkerId },
    /// The registration was removed.
    Unregistered,
}

/// Public view of one agent version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub id: WorkerId,
    pub cache_name: CacheName,
    pub state: WorkerState,
    pub digest: String,
}

/// Public view of the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub scope: Url,
    pub script_url: Url,
    pub installing: Option<WorkerInfo>,
    pub waiting: Option<WorkerInfo>,
    pub active: Option<WorkerInfo>,
}

/// A response delivered to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: FetchResponse,
    pub source: ResponseSource,
    /// Whether an agent handled the request.
    pub intercepted: bool,
}

#[derive(Clone)]
struct Worker {
    state: WorkerState,
    digest: String,
    agent: CachingAgent,
}

impl Worker {
    fn info(&self, id: WorkerId) -> WorkerInfo {
        WorkerInfo {
            id,
            cache_name: self.agent.cache_name().clone(),
            state: self.state,
            digest: self.digest.clone(),
        }
    }
}

struct RegistrationRecord {
    scope: Url,
    script_url: Url,
    installing: Option<WorkerId>,
    waiting: Option<WorkerId>,
    active: Option<WorkerId>,
}

#[derive(Default)]
struct HostState {
    registration: Option<RegistrationRecord>,
    workers: HashMap<WorkerId, Worker>,
    clients: BTreeMap<ClientId, Option<WorkerId>>,
    last_worker: u64,
    last_client: u64,
}

impl HostState {
    fn transition(&mut self, id: WorkerId, event: LifecycleEvent) -> Result<WorkerState, HostError> {
        let worker = self
            .workers
            .get_mut(&id)
            .ok_or(HostError::NotRegistered)?;
        worker.state = worker.state.transition(event)?;
        Ok(worker.state)
    }

    fn worker_info(&self, id: Option<WorkerId>) -> Option<WorkerInfo> {
        id.and_then(|id| self.workers.get(&id).map(|w| w.info(id)))
    }

    /// Drop redundant versions no page still uses.
    fn prune(&mut self) {
        let in_use: Vec<WorkerId> = self.clients.values().filter_map(|c| *c).collect();
        self.workers
            .retain(|id, w| w.state != WorkerState::Redundant || in_use.contains(id));
    }
}

/// Plays the browser for one origin: registration, lifecycle, page control.
#[derive(Clone)]
pub struct AgentHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    options: HostOptions,
    state: Mutex<HostState>,
    lifecycle: tokio::sync::Mutex<()>,
    in_flight: Mutex<Vec<Lifetime>>,
    events: broadcast::Sender<RegistrationEvent>,
    /// Bumped whenever an activation settles or versions are discarded.
    settled: watch::Sender<u64>,
}

impl std::fmt::Debug for AgentHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("AgentHost")
            .field("registered", &state.registration.is_some())
            .field("workers", &state.workers.len())
            .field("clients", &state.clients.len())
            .finish_non_exhaustive()
    }
}

impl AgentHost {
    /// Create a host with default options.
    #[must_use]
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self::with_options(storage, network, HostOptions::default())
    }

    /// Create a host with explicit options.
    #[must_use]
    pub fn with_options(
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        options: HostOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (settled, _) = watch::channel(0);
        Self {
            inner: Arc::new(HostInner {
                storage,
                network,
                options,
                state: Mutex::new(HostState::default()),
                lifecycle: tokio::sync::Mutex::new(()),
                in_flight: Mutex::new(Vec::new()),
                events,
                settled,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RegistrationEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn notify_settled(&self) {
        self.inner.settled.send_modify(|generation| *generation += 1);
    }

    /// Resolve the agent `pick` selects, waiting while that version is still
    /// activating.
    async fn settled_agent<F>(&self, pick: F) -> Result<Option<CachingAgent>, HostError>
    where
        F: Fn(&HostState) -> Result<Option<WorkerId>, HostError>,
    {
        loop {
            let mut settled = {
                let state = self.state();
                let Some(worker) = pick(&state)?.and_then(|id| state.workers.get(&id)) else {
                    return Ok(None);
                };
                if worker.state != WorkerState::Activating {
                    return Ok(Some(worker.agent.clone()));
                }
                // Subscribed under the state lock, so the settle cannot be missed.
                self.inner.settled.subscribe()
            };
            debug!("Waiting for activation to settle");
            if settled.changed().await.is_err() {
                return Ok(None);
            }
        }
    }

    fn track(&self, lifetime: Lifetime) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|l| l.pending() > 0);
        in_flight.push(lifetime);
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn is_known(&self, digest: &str) -> bool {
        let state = self.state();
        state.registration.as_ref().is_some_and(|r| {
            [r.installing, r.waiting, r.active]
                .into_iter()
                .flatten()
                .filter_map(|id| state.workers.get(&id))
                .any(|w| w.digest == digest)
        })
    }

    /// The cache storage shared by every version.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.inner.storage
    }

    /// Observe registration events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrationEvent> {
        self.inner.events.subscribe()
    }

    /// Current registration, if any.
    #[must_use]
    pub fn registration(&self) -> Option<Registration> {
        let state = self.state();
        state.registration.as_ref().map(|r| Registration {
            scope: r.scope.clone(),
            script_url: r.script_url.clone(),
            installing: state.worker_info(r.installing),
            waiting: state.worker_info(r.waiting),
            active: state.worker_info(r.active),
        })
    }

    /// Register the agent script at `script_url` for `scope` (resolved against
    /// the script URL), then install it if its bytes differ from every known
    /// version.
    ///
    /// # Errors
    ///
    /// Returns `HostError` if the script cannot be fetched or parsed, or if the
    /// new version fails to install. On install failure the previously active
    /// version keeps serving.
    #[instrument(skip(self), fields(script = %script_url))]
    pub async fn register(&self, script_url: &Url, scope: &str) -> Result<Registration, HostError> {
        let scope = script_url
            .join(scope)
            .map_err(|e| HostError::InvalidScope {
                scope: scope.to_string(),
                reason: e.to_string(),
            })?;

        {
            let mut state = self.state();
            match state.registration.as_mut() {
                Some(record) => record.script_url = script_url.clone(),
                None => {
                    state.registration = Some(RegistrationRecord {
                        scope: scope.clone(),
                        script_url: script_url.clone(),
                        installing: None,
                        waiting: None,
                        active: None,
                    });
                }
            }
        }

        if let Err(e) = self.update().await {
            self.drop_registration_if_empty();
            return Err(e);
        }
        self.registration().ok_or(HostError::NotRegistered)
    }

    /// Re-fetch the registered script and install it if it changed.
    ///
    /// Returns the new version's id, or `None` if the script is unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`AgentHost::register`].
    pub async fn update(&self) -> Result<Option<WorkerId>, HostError> {
        let (script_url, scope) = {
            let state = self.state();
            let record = state.registration.as_ref().ok_or(HostError::NotRegistered)?;
            (record.script_url.clone(), record.scope.clone())
        };

        let bytes = self.fetch_script(&script_url).await?;
        let digest = format!("{:x}", Sha256::digest(&bytes));

        if self.is_known(&digest) {
            debug!(digest = %digest, "Agent script unchanged");
            return Ok(None);
        }

        let descriptor = AgentDescriptor::from_slice(&bytes)?;
        info!(cache = %descriptor.cache_name, digest = %digest, "New agent version found");
        let config = AgentConfig::from_descriptor(&descriptor, scope)
            .with_install_fetch_timeout(self.inner.options.install_fetch_timeout);
        self.install_version(config, digest).await
    }

    async fn fetch_script(&self, script_url: &Url) -> Result<Vec<u8>, HostError> {
        let request = FetchRequest::get(script_url.clone());
        let response = self
            .inner
            .network
            .fetch(&request)
            .await
            .map_err(|source| HostError::ScriptFetch {
                url: script_url.to_string(),
                source,
            })?;
        if !response.is_success() {
            return Err(HostError::ScriptStatus {
                url: script_url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body.to_vec())
    }

    fn drop_registration_if_empty(&self) {
        let mut state = self.state();
        let empty = state
            .registration
            .as_ref()
            .is_some_and(|r| r.installing.is_none() && r.waiting.is_none() && r.active.is_none());
        if empty {
            state.registration = None;
        }
    }

    /// Install a new version. `None` if a concurrent update already
    /// installed the same bytes.
    async fn install_version(
        &self,
        config: AgentConfig,
        digest: String,
    ) -> Result<Option<WorkerId>, HostError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.is_known(&digest) {
            debug!(digest = %digest, "Version installed by a concurrent update");
            return Ok(None);
        }

        let cache_name = config.cache_name.clone();
        let agent = CachingAgent::new(
            config,
            Arc::clone(&self.inner.storage),
            Arc::clone(&self.inner.network),
        );

        let (id, active) = {
            let mut state = self.state();
            state.last_worker += 1;
            let id = WorkerId::new(state.last_worker);
            state.workers.insert(
                id,
                Worker {
                    state: WorkerState::Parsed,
                    digest,
                    agent: agent.clone(),
                },
            );
            state.transition(id, LifecycleEvent::Install)?;
            let record = state.registration.as_mut().ok_or(HostError::NotRegistered)?;
            record.installing = Some(id);
            (id, record.active)
        };
        self.emit(RegistrationEvent::UpdateFound { worker: id });
        self.emit(RegistrationEvent::StateChange {
            worker: id,
            state: WorkerState::Installing,
            active,
        });

        let dispatched = match agent.dispatch(AgentEvent::Install).await {
            Ok(dispatched) => dispatched,
            Err(source) => {
                warn!(worker = %id, error = %source, "Install failed, keeping previous version");
                {
                    let mut state = self.state();
                    state.transition(id, LifecycleEvent::InstallFailed)?;
                    if let Some(record) = state.registration.as_mut() {
                        record.installing = None;
                    }
                    state.prune();
                }
                self.emit(RegistrationEvent::StateChange {
                    worker: id,
                    state: WorkerState::Redundant,
                    active,
                });
                return Err(HostError::InstallFailed { cache_name, source });
            }
        };
        let skip_waiting =
            matches!(&dispatched.outcome, EventOutcome::Installed(report) if report.skip_waiting);
        dispatched.lifetime.settled().await;

        let (superseded, active) = {
            let mut state = self.state();
            state.transition(id, LifecycleEvent::InstallSucceeded)?;
            let record = state.registration.as_mut().ok_or(HostError::NotRegistered)?;
            record.installing = None;
            let superseded = record.waiting.replace(id);
            let active = record.active;
            if let Some(old) = superseded {
                state.transition(old, LifecycleEvent::Superseded)?;
            }
            (superseded, active)
        };
        if let Some(old) = superseded {
            self.emit(RegistrationEvent::StateChange {
                worker: old,
                state: WorkerState::Redundant,
                active,
            });
        }
        info!(worker = %id, "Agent installed");
        self.emit(RegistrationEvent::StateChange {
            worker: id,
            state: WorkerState::Installed,
            active,
        });

        if skip_waiting || active.is_none() {
            self.activate_waiting().await?;
        }
        Ok(Some(id))
    }

    /// Promote the waiting version. Caller holds the lifecycle lock.
    async fn activate_waiting(&self) -> Result<(), HostError> {
        let (id, previous, agent) = {
            let mut state = self.state();
            let record = state.registration.as_mut().ok_or(HostError::NotRegistered)?;
            let Some(id) = record.waiting.take() else {
                return Ok(());
            };
            let previous = record.active.replace(id);
            if let Some(old) = previous {
                state.transition(old, LifecycleEvent::Superseded)?;
            }
            state.transition(id, LifecycleEvent::Activate)?;
            let agent = state
                .workers
                .get(&id)
                .map(|w| w.agent.clone())
                .ok_or(HostError::NotRegistered)?;
            (id, previous, agent)
        };
        if let Some(old) = previous {
            self.emit(RegistrationEvent::StateChange {
                worker: old,
                state: WorkerState::Redundant,
                active: Some(id),
            });
        }
        self.emit(RegistrationEvent::StateChange {
            worker: id,
            state: WorkerState::Activating,
            active: Some(id),
        });

        let claim = match agent.dispatch(AgentEvent::Activate).await {
            Ok(dispatched) => {
                let claim = matches!(
                    &dispatched.outcome,
                    EventOutcome::Activated(report) if report.claim_clients
                );
                dispatched.lifetime.settled().await;
                claim
            }
            Err(e) => {
                error!(worker = %id, error = %e, "Activate handler failed, stale stores kept");
                false
            }
        };

        let settled = self.state().transition(id, LifecycleEvent::ActivateSettled);
        self.notify_settled();
        settled?;
        info!(worker = %id, "Agent activated");
        self.emit(RegistrationEvent::StateChange {
            worker: id,
            state: WorkerState::Activated,
            active: Some(id),
        });

        if claim {
            self.claim(id);
        } else {
            self.state().prune();
        }
        Ok(())
    }

    fn claim(&self, id: WorkerId) {
        {
            let mut state = self.state();
            for controller in state.clients.values_mut() {
                *controller = Some(id);
            }
            state.prune();
        }
        debug!(worker = %id, "Claimed clients");
        self.emit(RegistrationEvent::ControllerChange { worker: id });
    }

    /// Remove the registration. Returns whether one existed.
    pub async fn unregister(&self) -> bool {
        let _lifecycle = self.inner.lifecycle.lock().await;
        let existed = {
            let mut state = self.state();
            let existed = state.registration.take().is_some();
            for worker in state.workers.values_mut() {
                worker.state = WorkerState::Redundant;
            }
            for controller in state.clients.values_mut() {
                *controller = None;
            }
            state.prune();
            existed
        };
        self.notify_settled();
        if existed {
            info!("Agent unregistered");
            self.emit(RegistrationEvent::Unregistered);
        }
        existed
    }

    /// Open a page. It is controlled by the active version, if any.
    pub fn open_client(&self) -> ClientId {
        let mut state = self.state();
        state.last_client += 1;
        let id = ClientId::new(state.last_client);
        let controller = state.registration.as_ref().and_then(|r| r.active);
        state.clients.insert(id, controller);
        id
    }

    /// Close a page.
    pub fn close_client(&self, client: ClientId) {
        let mut state = self.state();
        state.clients.remove(&client);
        state.prune();
    }

    /// Reload a page so it adopts the active version.
    ///
    /// # Errors
    ///
    /// Returns `HostError::UnknownClient` if the page is not open.
    pub fn reload(&self, client: ClientId) -> Result<(), HostError> {
        let mut state = self.state();
        let active = state.registration.as_ref().and_then(|r| r.active);
        let controller = state
            .clients
            .get_mut(&client)
            .ok_or(HostError::UnknownClient(client))?;
        *controller = active;
        state.prune();
        Ok(())
    }

    /// The version controlling a page.
    #[must_use]
    pub fn controller(&self, client: ClientId) -> Option<WorkerInfo> {
        let state = self.state();
        let id = state.clients.get(&client).copied().flatten();
        state.worker_info(id)
    }

    /// Issue a request from a page.
    ///
    /// A page whose controller is still activating waits for the activation
    /// to settle before the agent sees the request.
    ///
    /// # Errors
    ///
    /// Returns `HostError::LoadFailed` when the agent has no response,
    /// `HostError::ScriptFetch`-style network errors for uncontrolled
    /// requests, or `HostError::UnknownClient`.
    #[instrument(skip(self, request), fields(client = %client, url = %request.url))]
    pub async fn fetch(&self, client: ClientId, request: FetchRequest) -> Result<Served, HostError> {
        let agent = self
            .settled_agent(|state| {
                state
                    .clients
                    .get(&client)
                    .copied()
                    .ok_or(HostError::UnknownClient(client))
            })
            .await?;

        let Some(agent) = agent else {
            return self.fetch_uncontrolled(&request).await;
        };

        let url = request.url.to_string();
        let dispatched = agent
            .dispatch(AgentEvent::Fetch(request.clone()))
            .await
            .map_err(|_| HostError::LoadFailed(url.clone()))?;
        if !dispatched.lifetime.is_empty() {
            self.track(dispatched.lifetime);
        }

        match dispatched.outcome {
            EventOutcome::Fetch(FetchOutcome::Respond { response, source }) => Ok(Served {
                response,
                source,
                intercepted: true,
            }),
            EventOutcome::Fetch(FetchOutcome::Passthrough) => {
                self.fetch_uncontrolled(&request).await
            }
            _ => Err(HostError::LoadFailed(url)),
        }
    }

    async fn fetch_uncontrolled(&self, request: &FetchRequest) -> Result<Served, HostError> {
        let response = self
            .inner
            .network
            .fetch(request)
            .await
            .map_err(|e: NetworkError| {
                debug!(error = %e, "Network request failed");
                HostError::LoadFailed(request.url.to_string())
            })?;
        Ok(Served {
            response,
            source: ResponseSource::Network,
            intercepted: false,
        })
    }

    /// Wait until every background task started by fetches has finished.
    pub async fn idle(&self) {
        loop {
            let pending: Vec<Lifetime> = std::mem::take(
                &mut *self
                    .inner
                    .in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            if pending.is_empty() {
                return;
            }
            for lifetime in pending {
                lifetime.settled().await;
            }
        }
    }

    async fn dispatch_to_active(&self, event: AgentEvent) -> Result<EventOutcome, HostError> {
        let agent = self
            .settled_agent(|state| {
                state
                    .registration
                    .as_ref()
                    .and_then(|r| r.active)
                    .map(Some)
                    .ok_or(HostError::NotRegistered)
            })
            .await?
            .ok_or(HostError::NotRegistered)?;
        let kind = event.kind();
        let dispatched = agent.dispatch(event).await.map_err(|e| {
            warn!(event = %kind, error = %e, "Event handler failed");
            HostError::LoadFailed(kind.to_string())
        })?;
        dispatched.lifetime.settled().await;
        Ok(dispatched.outcome)
    }

    /// Deliver a push message to the active version.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotRegistered` if no version is active.
    pub async fn push(&self, data: Option<String>) -> Result<EventOutcome, HostError> {
        self.dispatch_to_active(AgentEvent::Push { data }).await
    }

    /// Deliver a background sync to the active version.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotRegistered` if no version is active.
    pub async fn sync(&self, tag: &str) -> Result<EventOutcome, HostError> {
        self.dispatch_to_active(AgentEvent::Sync {
            tag: tag.to_string(),
        })
        .await
    }

    /// Deliver a notification click to the active version.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotRegistered` if no version is active.
    pub async fn notification_click(
        &self,
        action: Option<String>,
    ) -> Result<EventOutcome, HostError> {
        self.dispatch_to_active(AgentEvent::NotificationClick { action })
            .await
    }
}
