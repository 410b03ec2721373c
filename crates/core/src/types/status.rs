//! Status enums for the agent lifecycle and the page environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one agent version.
///
/// ```text
/// Parsed -> Installing -> Installed -> Activating -> Activated
///               |            |                          |
///               +-> Redundant <--------- superseded ----+
/// ```
///
/// `Installed` is the "waiting" state: installed but not yet controlling pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// A named lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The browser starts installing a newly detected script.
    Install,
    /// Every manifest resource was stored.
    InstallSucceeded,
    /// A manifest resource could not be stored.
    InstallFailed,
    /// The waiting version is promoted.
    Activate,
    /// The activate handler settled.
    ActivateSettled,
    /// A newer version replaced this one.
    Superseded,
}

/// Attempted a transition the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} to a worker in state {from}")]
pub struct TransitionError {
    pub from: WorkerState,
    pub event: LifecycleEvent,
}

impl WorkerState {
    /// Apply a lifecycle event, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if the event is not valid in this state.
    pub const fn transition(self, event: LifecycleEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (Self::Parsed, LifecycleEvent::Install) => Ok(Self::Installing),
            (Self::Installing, LifecycleEvent::InstallSucceeded) => Ok(Self::Installed),
            (Self::Installing, LifecycleEvent::InstallFailed) => Ok(Self::Redundant),
            (Self::Installed, LifecycleEvent::Activate) => Ok(Self::Activating),
            (Self::Activating, LifecycleEvent::ActivateSettled) => Ok(Self::Activated),
            (Self::Installed | Self::Activated, LifecycleEvent::Superseded) => Ok(Self::Redundant),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    /// Whether a worker in this state may serve fetches.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

impl std::str::FromStr for WorkerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parsed" => Ok(Self::Parsed),
            "installing" => Ok(Self::Installing),
            "installed" => Ok(Self::Installed),
            "activating" => Ok(Self::Activating),
            "activated" => Ok(Self::Activated),
            "redundant" => Ok(Self::Redundant),
            _ => Err(format!("invalid worker state: {s}")),
        }
    }
}

/// Network connectivity as reported by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    /// Build from an online flag.
    #[must_use]
    pub const fn from_online(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }

    /// Whether the network is reachable.
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Which build the page is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("invalid build mode: {s}")),
        }
    }
}
