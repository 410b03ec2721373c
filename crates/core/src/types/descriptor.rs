//! The agent descriptor published by the origin server.
//!
//! The raw bytes of this document are the agent's "script": when they change,
//! the host treats it as a new agent version and runs a fresh install.

use serde::{Deserialize, Serialize};

use super::cache_name::CacheName;
use super::manifest::{OFFLINE_URL, ResourceManifest};

/// File extensions eligible for opportunistic cache-first storage.
pub const DEFAULT_ASSET_EXTENSIONS: &[&str] = &[
    "js", "css", "png", "jpg", "jpeg", "svg", "gif", "woff", "woff2", "ttf", "eot",
];

/// URL substrings that are always forced to the network.
pub const DEFAULT_BYPASS_DOMAINS: &[&str] = &["supabase.co"];

/// Current cache store name.
pub const DEFAULT_CACHE_NAME: &str = "app-cache-v2";

/// Product name shown in notifications and install prompts.
pub const DEFAULT_APP_NAME: &str = "RwaDiscount";

/// Everything a host needs to build a caching agent for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub app_name: String,
    pub cache_name: CacheName,
    pub precache: ResourceManifest,
    pub offline_url: String,
    pub asset_extensions: Vec<String>,
    pub bypass_domains: Vec<String>,
}

impl AgentDescriptor {
    /// Serialize to the canonical byte form served to hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Parse a descriptor from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid descriptor.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl Default for AgentDescriptor {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            // DEFAULT_CACHE_NAME is a valid literal
            cache_name: CacheName::parse(DEFAULT_CACHE_NAME)
                .unwrap_or_else(|_| unreachable!("default cache name is valid")),
            precache: ResourceManifest::v2(),
            offline_url: OFFLINE_URL.to_string(),
            asset_extensions: DEFAULT_ASSET_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            bypass_domains: DEFAULT_BYPASS_DOMAINS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_current_deployment() {
        let descriptor = AgentDescriptor::default();
        assert_eq!(descriptor.cache_name.as_str(), "app-cache-v2");
        assert_eq!(descriptor.precache.len(), 4);
        assert_eq!(descriptor.asset_extensions.len(), 11);
        assert_eq!(descriptor.bypass_domains, vec!["supabase.co".to_string()]);
    }

    #[test]
    fn test_bytes_round_trip() {
        let descriptor = AgentDescriptor::default();
        let bytes = descriptor.to_bytes().unwrap();
        assert_eq!(AgentDescriptor::from_slice(&bytes).unwrap(), descriptor);
    }

    #[test]
    fn test_rejects_invalid_manifest() {
        let json = r#"{
            "app_name": "RwaDiscount",
            "cache_name": "app-cache-v3",
            "precache": [],
            "offline_url": "/offline.html",
            "asset_extensions": [],
            "bypass_domains": []
        }"#;
        assert!(AgentDescriptor::from_slice(json.as_bytes()).is_err());
    }
}
