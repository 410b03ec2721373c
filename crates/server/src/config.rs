//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `RWA_HOST` - Bind address (default: 127.0.0.1)
//! - `RWA_PORT` - Listen port (default: 3000)
//! - `RWA_STATIC_DIR` - Directory holding `icons/` (default: crates/server/static)
//! - `RWA_CACHE_VERSION` - Store name of the current deployment (default: app-cache-v2)
//! - `RWA_BACKEND_URL` - External backend; its host is never cached (default: <https://project.supabase.co>)
//! - `RWA_APP_NAME` - Product name (default: RwaDiscount)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use rwa_discount_core::{
    AgentDescriptor, CacheName, DEFAULT_APP_NAME, DEFAULT_CACHE_NAME, ResourceManifest,
};
use thiserror::Error;
use url::Url;

const DEFAULT_STATIC_DIR: &str = "crates/server/static";
const DEFAULT_BACKEND_URL: &str = "https://project.supabase.co";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory containing static files (icons)
    pub static_dir: PathBuf,
    /// Store name the published agent uses
    pub cache_version: CacheName,
    /// Resources the published agent precaches
    pub precache: ResourceManifest,
    /// External data/auth backend
    pub backend_url: Url,
    /// Product name
    pub app_name: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            cache_version: CacheName::parse(DEFAULT_CACHE_NAME)
                .unwrap_or_else(|_| unreachable!()),
            precache: ResourceManifest::v2(),
            backend_url: Url::parse(DEFAULT_BACKEND_URL).unwrap_or_else(|_| unreachable!()),
            app_name: DEFAULT_APP_NAME.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("RWA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RWA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RWA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RWA_PORT".to_string(), e.to_string()))?;
        let static_dir = PathBuf::from(get_env_or_default("RWA_STATIC_DIR", DEFAULT_STATIC_DIR));
        let cache_version = CacheName::parse(&get_env_or_default(
            "RWA_CACHE_VERSION",
            DEFAULT_CACHE_NAME,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("RWA_CACHE_VERSION".to_string(), e.to_string()))?;
        let backend_url = Url::parse(&get_env_or_default("RWA_BACKEND_URL", DEFAULT_BACKEND_URL))
            .map_err(|e| {
            ConfigError::InvalidEnvVar("RWA_BACKEND_URL".to_string(), e.to_string())
        })?;
        let app_name = get_env_or_default("RWA_APP_NAME", DEFAULT_APP_NAME);

        Ok(Self {
            host,
            port,
            static_dir,
            cache_version,
            precache: ResourceManifest::v2(),
            backend_url,
            app_name,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The agent descriptor this deployment publishes.
    #[must_use]
    pub fn descriptor(&self) -> AgentDescriptor {
        let bypass_domains = self
            .backend_url
            .host_str()
            .map(|host| vec![host.to_string()])
            .unwrap_or_default();

        AgentDescriptor {
            app_name: self.app_name.clone(),
            cache_name: self.cache_version.clone(),
            precache: self.precache.clone(),
            bypass_domains,
            ..AgentDescriptor::default()
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.cache_version.as_str(), "app-cache-v2");
        assert_eq!(config.app_name, "RwaDiscount");
    }

    #[test]
    fn test_descriptor_bypasses_backend_host() {
        let descriptor = ServerConfig::default().descriptor();
        assert_eq!(descriptor.bypass_domains, vec!["project.supabase.co"]);
        assert_eq!(descriptor.precache, ResourceManifest::v2());
        assert_eq!(descriptor.cache_name.as_str(), "app-cache-v2");
    }
}
