//! Agent registration and removal.

use std::sync::Arc;

use rwa_discount_agent::{AgentHost, Registration};
use rwa_discount_core::{BuildMode, ClientId};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

use crate::config::ShellConfig;
use crate::error::RegistrationError;
use crate::events::AppEvents;
use crate::update::{UpdatePrompt, watch_updates};

/// A live registration plus the watcher that prompts on updates.
#[derive(Debug)]
pub struct RegistrationHandle {
    host: AgentHost,
    registration: Registration,
    watcher: JoinHandle<()>,
}

impl RegistrationHandle {
    /// Registration as it was when `register` returned.
    #[must_use]
    pub const fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Registration as it is now.
    #[must_use]
    pub fn current(&self) -> Option<Registration> {
        self.host.registration()
    }

    #[must_use]
    pub const fn scope(&self) -> &Url {
        &self.registration.scope
    }

    /// Check the origin for a new agent version.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Host` if the check or install fails.
    pub async fn update(&self) -> Result<bool, RegistrationError> {
        Ok(self.host.update().await?.is_some())
    }
}

impl Drop for RegistrationHandle {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Register the caching agent for the page `client`.
///
/// Only production builds register. Update prompts for `client` start before
/// the registration so a version installed during this call is seen too.
///
/// # Errors
///
/// Returns `RegistrationError::Unsupported` without a host,
/// `RegistrationError::DevelopmentBuild` outside production, or the host's
/// failure.
pub async fn register(
    host: Option<&AgentHost>,
    config: &ShellConfig,
    client: ClientId,
    prompt: Arc<dyn UpdatePrompt>,
    events: &AppEvents,
) -> Result<RegistrationHandle, RegistrationError> {
    let Some(host) = host else {
        debug!("Caching agent not supported");
        return Err(RegistrationError::Unsupported);
    };
    if config.build_mode != BuildMode::Production {
        return Err(RegistrationError::DevelopmentBuild);
    }
    let script_url = config.script_url()?;

    info!(script = %script_url, scope = %config.scope, "Registering caching agent");
    let watcher = watch_updates(
        host.subscribe(),
        host.clone(),
        client,
        prompt,
        events.clone(),
        config.app_name.clone(),
    );

    match host.register(&script_url, &config.scope).await {
        Ok(registration) => {
            info!(scope = %registration.scope, "Registration successful");
            Ok(RegistrationHandle {
                host: host.clone(),
                registration,
                watcher,
            })
        }
        Err(e) => {
            error!(error = %e, "Registration failed");
            watcher.abort();
            Err(e.into())
        }
    }
}

/// Remove any existing registration. Returns whether one was removed.
pub async fn unregister(host: Option<&AgentHost>) -> bool {
    let Some(host) = host else {
        return false;
    };
    let removed = host.unregister().await;
    if removed {
        info!("Caching agent unregistered");
    }
    removed
}
