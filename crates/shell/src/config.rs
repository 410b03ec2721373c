//! Page controller configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `RWA_APP_NAME` - Product name shown in prompts (default: RwaDiscount)
//! - `RWA_BUILD_MODE` - `development` or `production` (default: development)
//! - `RWA_ORIGIN` - Origin serving the app (default: <http://localhost:3000/>)

use rwa_discount_core::{BuildMode, DEFAULT_APP_NAME};
use url::Url;

use crate::error::ConfigError;

/// Path of the agent script on the origin.
pub const AGENT_SCRIPT_PATH: &str = "/agent.json";

/// Scope the agent is registered for.
pub const AGENT_SCOPE: &str = "/";

const DEFAULT_ORIGIN: &str = "http://localhost:3000/";

/// Page controller configuration.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Product name shown in the update prompt and install banner
    pub app_name: String,
    /// Registration only happens in production builds
    pub build_mode: BuildMode,
    /// Origin the page was loaded from
    pub origin: Url,
    /// Agent script path, relative to the origin
    pub script_path: String,
    /// Registration scope, relative to the script
    pub scope: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            build_mode: BuildMode::Development,
            origin: Url::parse(DEFAULT_ORIGIN).unwrap_or_else(|_| unreachable!()),
            script_path: AGENT_SCRIPT_PATH.to_string(),
            scope: AGENT_SCOPE.to_string(),
        }
    }
}

impl ShellConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let app_name = std::env::var("RWA_APP_NAME").unwrap_or(defaults.app_name);
        let build_mode = match std::env::var("RWA_BUILD_MODE") {
            Ok(value) => value
                .parse::<BuildMode>()
                .map_err(|e| ConfigError::InvalidEnvVar("RWA_BUILD_MODE".to_string(), e))?,
            Err(_) => defaults.build_mode,
        };
        let origin = match std::env::var("RWA_ORIGIN") {
            Ok(value) => Url::parse(&value).map_err(|e| {
                ConfigError::InvalidEnvVar("RWA_ORIGIN".to_string(), e.to_string())
            })?,
            Err(_) => defaults.origin,
        };

        Ok(Self {
            app_name,
            build_mode,
            origin,
            ..Self::default()
        })
    }

    /// Override the build mode.
    #[must_use]
    pub const fn with_build_mode(mut self, build_mode: BuildMode) -> Self {
        self.build_mode = build_mode;
        self
    }

    /// Override the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = origin;
        self
    }

    /// Absolute URL of the agent script.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidScriptPath` if the path cannot be joined.
    pub fn script_url(&self) -> Result<Url, ConfigError> {
        self.origin
            .join(&self.script_path)
            .map_err(|e| ConfigError::InvalidScriptPath(self.script_path.clone(), e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.app_name, "RwaDiscount");
        assert_eq!(config.build_mode, BuildMode::Development);
        assert_eq!(
            config.script_url().unwrap().as_str(),
            "http://localhost:3000/agent.json"
        );
    }

    #[test]
    fn test_script_url_follows_origin() {
        let config = ShellConfig::default()
            .with_origin(Url::parse("https://deals.example.com/app/").unwrap());
        assert_eq!(
            config.script_url().unwrap().as_str(),
            "https://deals.example.com/agent.json"
        );
    }
}
