//! Page controller errors.

use rwa_discount_agent::HostError;
use thiserror::Error;

/// Agent registration did not happen.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The environment has no caching agent support.
    #[error("caching agent not supported")]
    Unsupported,

    /// Registration is skipped outside production builds.
    #[error("caching agent is only registered in production builds")]
    DevelopmentBuild,

    /// The agent script URL could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The host rejected the registration.
    #[error("registration failed: {0}")]
    Host(#[from] HostError),
}

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid agent script path {0}: {1}")]
    InvalidScriptPath(String, String),
}

/// The native install prompt failed before the user chose.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("install prompt failed: {0}")]
pub struct InstallPromptError(pub String);
