//! Page bootstrap.
//!
//! Production builds register the caching agent; every build wires the
//! install prompt and network status detection.

use std::sync::Arc;

use rwa_discount_agent::AgentHost;
use rwa_discount_core::{ClientId, Connectivity};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ShellConfig;
use crate::display::{Capabilities, DisplayContext, can_install, is_standalone};
use crate::error::RegistrationError;
use crate::events::{AppEvents, watch_network_status};
use crate::install::InstallCoordinator;
use crate::registration::{RegistrationHandle, register, unregister};
use crate::update::UpdatePrompt;

/// Everything the page gets from its environment.
pub struct PageEnvironment {
    /// `None` when the environment cannot run a caching agent. Ignored
    /// unless `capabilities.agents` is set.
    pub host: Option<AgentHost>,
    pub connectivity: watch::Receiver<Connectivity>,
    pub update_prompt: Arc<dyn UpdatePrompt>,
    pub events: AppEvents,
    pub display: DisplayContext,
    pub capabilities: Capabilities,
}

/// A bootstrapped page.
pub struct PageController {
    host: Option<AgentHost>,
    client: Option<ClientId>,
    events: AppEvents,
    install: InstallCoordinator,
    registration: Option<RegistrationHandle>,
    display: DisplayContext,
    capabilities: Capabilities,
    network_status: JoinHandle<()>,
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageController")
            .field("client", &self.client)
            .field("registered", &self.registration.is_some())
            .field("install", &self.install)
            .finish_non_exhaustive()
    }
}

impl PageController {
    /// Bootstrap the page.
    ///
    /// Registration failures are logged, never fatal to the page.
    pub async fn bootstrap(config: ShellConfig, environment: PageEnvironment) -> Self {
        let PageEnvironment {
            host,
            connectivity,
            update_prompt,
            events,
            display,
            capabilities,
        } = environment;

        let host = host.filter(|_| capabilities.agents);
        if host.is_none() {
            debug!("Caching agents not supported");
        }
        let client = host.as_ref().map(AgentHost::open_client);

        let registration = match client {
            Some(client) => {
                match register(host.as_ref(), &config, client, update_prompt, &events).await {
                    Ok(handle) => {
                        info!("Caching agent registered successfully");
                        Some(handle)
                    }
                    Err(RegistrationError::DevelopmentBuild) => {
                        debug!("Skipping caching agent registration in development");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "Caching agent registration failed");
                        None
                    }
                }
            }
            None => None,
        };

        let install = InstallCoordinator::new(&config.app_name);
        let network_status = watch_network_status(connectivity, events.clone());

        Self {
            host,
            client,
            events,
            install,
            registration,
            display,
            capabilities,
            network_status,
        }
    }

    /// The host, when the environment supports agents.
    #[must_use]
    pub const fn host(&self) -> Option<&AgentHost> {
        self.host.as_ref()
    }

    /// This page's client id on the host.
    #[must_use]
    pub const fn client(&self) -> Option<ClientId> {
        self.client
    }

    #[must_use]
    pub const fn events(&self) -> &AppEvents {
        &self.events
    }

    /// Install prompt handling.
    #[must_use]
    pub const fn install(&self) -> &InstallCoordinator {
        &self.install
    }

    #[must_use]
    pub const fn registration(&self) -> Option<&RegistrationHandle> {
        self.registration.as_ref()
    }

    #[must_use]
    pub fn is_standalone(&self) -> bool {
        is_standalone(&self.display)
    }

    #[must_use]
    pub const fn can_install(&self) -> bool {
        can_install(self.capabilities)
    }

    /// Show the native install prompt if one is held.
    pub async fn prompt_install(&self) -> bool {
        self.install.prompt_install().await
    }

    /// Remove the agent registration, if any.
    pub async fn unregister(&mut self) -> bool {
        self.registration = None;
        unregister(self.host.as_ref()).await
    }
}

impl Drop for PageController {
    fn drop(&mut self) {
        self.network_status.abort();
        if let (Some(host), Some(client)) = (&self.host, self.client) {
            host.close_client(client);
        }
    }
}
