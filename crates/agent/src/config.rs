//! Caching agent configuration.
//!
//! The defaults describe the current deployment (`app-cache-v2`). A host
//! normally builds the config from the [`AgentDescriptor`] served by the
//! origin, so a new deployment only has to publish a new descriptor.

use std::time::Duration;

use rwa_discount_core::{AgentDescriptor, CacheName, ResourceManifest};
use url::Url;

use crate::error::AgentError;

/// Default per-resource timeout for install-phase fetches.
pub const DEFAULT_INSTALL_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default scope the agent controls.
pub const DEFAULT_SCOPE: &str = "http://localhost:3000/";

/// Caching agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Product name used for notifications.
    pub app_name: String,
    /// Root URL of the controlled scope. Manifest paths resolve against it.
    pub scope: Url,
    /// Name of the store this version owns.
    pub cache_name: CacheName,
    /// Resources stored during install.
    pub precache: ResourceManifest,
    /// Placeholder served for navigations when the network fails.
    pub offline_url: String,
    /// Extensions eligible for opportunistic storage (lowercase, no dot).
    pub asset_extensions: Vec<String>,
    /// URL substrings that always go to the network.
    pub bypass_domains: Vec<String>,
    /// Upper bound on each install-phase fetch.
    pub install_fetch_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        // DEFAULT_SCOPE is a valid literal
        let scope = Url::parse(DEFAULT_SCOPE).unwrap_or_else(|_| unreachable!());
        Self::from_descriptor(&AgentDescriptor::default(), scope)
    }
}

impl From<&AgentDescriptor> for AgentConfig {
    fn from(descriptor: &AgentDescriptor) -> Self {
        Self::default().with_descriptor(descriptor)
    }
}

impl AgentConfig {
    fn with_descriptor(self, descriptor: &AgentDescriptor) -> Self {
        Self::from_descriptor(descriptor, self.scope)
    }

    /// Build a config for `scope` from a published descriptor.
    #[must_use]
    pub fn from_descriptor(descriptor: &AgentDescriptor, scope: Url) -> Self {
        Self {
            app_name: descriptor.app_name.clone(),
            scope,
            cache_name: descriptor.cache_name.clone(),
            precache: descriptor.precache.clone(),
            offline_url: descriptor.offline_url.clone(),
            asset_extensions: descriptor
                .asset_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            bypass_domains: descriptor.bypass_domains.clone(),
            install_fetch_timeout: DEFAULT_INSTALL_FETCH_TIMEOUT,
        }
    }

    /// Override the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Url) -> Self {
        self.scope = scope;
        self
    }

    /// Override the store name.
    #[must_use]
    pub fn with_cache_name(mut self, cache_name: CacheName) -> Self {
        self.cache_name = cache_name;
        self
    }

    /// Override the precache manifest.
    #[must_use]
    pub fn with_precache(mut self, precache: ResourceManifest) -> Self {
        self.precache = precache;
        self
    }

    /// Override the install fetch timeout.
    #[must_use]
    pub const fn with_install_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.install_fetch_timeout = timeout;
        self
    }

    /// Override the bypassed domains.
    #[must_use]
    pub fn with_bypass_domains(mut self, domains: Vec<String>) -> Self {
        self.bypass_domains = domains;
        self
    }

    /// Resolve a root-relative path against the scope.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidPath` if the path cannot be joined.
    pub fn resolve(&self, path: &str) -> Result<Url, AgentError> {
        self.scope.join(path).map_err(|e| AgentError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}
