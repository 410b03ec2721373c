//! Error types for the caching agent and its host.

use std::time::Duration;

use rwa_discount_core::{CacheName, TransitionError};
use thiserror::Error;

/// A network fetch failed before producing a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The network is unreachable (offline, DNS failure, connection refused).
    #[error("network unreachable: {0}")]
    Offline(String),

    /// The fetch did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Offline(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A cache storage operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The named store does not exist.
    #[error("cache store not found: {0}")]
    NotFound(CacheName),

    /// The backing storage refused the operation.
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
}

/// A lifecycle or fetch handler failed.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A manifest resource could not be fetched during install.
    #[error("failed to precache {path}: {source}")]
    Precache {
        path: String,
        #[source]
        source: NetworkError,
    },

    /// A manifest resource came back with a non-success status.
    #[error("precache of {path} returned status {status}")]
    PrecacheStatus { path: String, status: u16 },

    /// A manifest path could not be resolved against the scope.
    #[error("invalid resource path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Cache storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Host-level failures surfaced to the page controller.
#[derive(Debug, Error)]
pub enum HostError {
    /// The agent script could not be fetched.
    #[error("failed to fetch agent script {url}: {source}")]
    ScriptFetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    /// The agent script fetch returned a non-success status.
    #[error("agent script {url} returned status {status}")]
    ScriptStatus { url: String, status: u16 },

    /// The agent script was not a valid descriptor.
    #[error("invalid agent script: {0}")]
    InvalidScript(#[from] serde_json::Error),

    /// The requested scope is not a valid URL.
    #[error("invalid scope {scope}: {reason}")]
    InvalidScope { scope: String, reason: String },

    /// The new version failed to install; the previous version keeps serving.
    #[error("install of {cache_name} failed: {source}")]
    InstallFailed {
        cache_name: CacheName,
        #[source]
        source: AgentError,
    },

    /// No registration exists for this host.
    #[error("no agent registered")]
    NotRegistered,

    /// The page is not known to the host.
    #[error("unknown client: {0}")]
    UnknownClient(rwa_discount_core::ClientId),

    /// The agent produced no response and the load failed.
    #[error("failed to load {0}")]
    LoadFailed(String),

    /// A worker attempted an invalid lifecycle transition.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] TransitionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precache_error_display() {
        let err = AgentError::Precache {
            path: "/offline.html".to_string(),
            source: NetworkError::Offline("connection refused".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to precache /offline.html: network unreachable: connection refused"
        );
    }

    #[test]
    fn test_precache_status_display() {
        let err = AgentError::PrecacheStatus {
            path: "/manifest.json".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "precache of /manifest.json returned status 404");
    }
}
