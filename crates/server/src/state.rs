//! Application state shared across handlers.

use std::sync::Arc;

use bytes::Bytes;
use rwa_discount_core::AgentDescriptor;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The agent descriptor is serialized once at
/// startup so every response carries identical bytes; hosts compare those
/// bytes to detect a new deployment.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    descriptor: AgentDescriptor,
    descriptor_bytes: Bytes,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be serialized.
    pub fn new(config: ServerConfig) -> Result<Self, serde_json::Error> {
        let descriptor = config.descriptor();
        let descriptor_bytes = Bytes::from(descriptor.to_bytes()?);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                descriptor,
                descriptor_bytes,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// The published agent descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.inner.descriptor
    }

    /// The descriptor in its served byte form.
    #[must_use]
    pub fn descriptor_bytes(&self) -> Bytes {
        self.inner.descriptor_bytes.clone()
    }
}
