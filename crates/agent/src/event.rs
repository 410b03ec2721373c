//! Events the host dispatches to an agent, and what the agent hands back.
//!
//! Each dispatched event carries a [`Lifetime`]: background work the handler
//! started (for example writing a fetched asset into the store) is attached to
//! it, and the host keeps the event alive until the lifetime settles.

use std::fmt;
use std::future::Future;

use rwa_discount_core::{CacheName, FetchRequest, FetchResponse};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::notification::{Notification, NotificationClick};

/// Something the browser asks the agent to handle.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
    Sync { tag: String },
    Push { data: Option<String> },
    NotificationClick { action: Option<String> },
}

impl AgentEvent {
    /// The event's kind, for logging.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Install => EventKind::Install,
            Self::Activate => EventKind::Activate,
            Self::Fetch(_) => EventKind::Fetch,
            Self::Sync { .. } => EventKind::Sync,
            Self::Push { .. } => EventKind::Push,
            Self::NotificationClick { .. } => EventKind::NotificationClick,
        }
    }
}

/// Event discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Sync,
    Push,
    NotificationClick,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Activate => write!(f, "activate"),
            Self::Fetch => write!(f, "fetch"),
            Self::Sync => write!(f, "sync"),
            Self::Push => write!(f, "push"),
            Self::NotificationClick => write!(f, "notificationclick"),
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Store that now holds every manifest resource.
    pub cache_name: CacheName,
    /// Paths that were stored, in manifest order.
    pub cached: Vec<String>,
    /// The agent asks to skip the waiting phase.
    pub skip_waiting: bool,
}

/// Result of an activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    /// Stores that were deleted.
    pub deleted: Vec<CacheName>,
    /// Stale stores that could not be deleted.
    pub failed: Vec<CacheName>,
    /// The agent asks to take control of all open pages.
    pub claim_clients: bool,
}

/// Where a fetch response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Store,
    OfflinePlaceholder,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Store => write!(f, "store"),
            Self::OfflinePlaceholder => write!(f, "offline placeholder"),
        }
    }
}

/// How the agent answered a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request to the network untouched.
    Passthrough,
    /// The agent supplied a response.
    Respond {
        response: FetchResponse,
        source: ResponseSource,
    },
    /// The agent intercepted but has nothing to give; the load fails.
    NoResponse,
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetch(FetchOutcome),
    Synced { tag: String, handled: bool },
    Notify(Notification),
    NotificationClicked(NotificationClick),
}

/// Background work attached to one event.
#[derive(Debug, Default)]
pub struct Lifetime {
    tasks: Vec<JoinHandle<()>>,
}

impl Lifetime {
    /// An empty lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the event until `work` completes.
    ///
    /// The work runs immediately on the runtime; its outcome never affects the
    /// response already handed to the page.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(work));
    }

    /// Number of tasks still attached.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Whether nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every attached task.
    pub async fn settled(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Extended task did not complete");
            }
        }
    }
}

/// A handler's outcome together with the work it left running.
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: EventOutcome,
    pub lifetime: Lifetime,
}

impl Dispatched {
    /// Outcome with nothing left running.
    #[must_use]
    pub fn settled(outcome: EventOutcome) -> Self {
        Self {
            outcome,
            lifetime: Lifetime::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_lifetime_waits_for_tasks() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        let mut lifetime = Lifetime::new();
        lifetime.wait_until(async move {
            tokio::task::yield_now().await;
            flag.store(true, Ordering::SeqCst);
        });
        assert!(!lifetime.is_empty());

        lifetime.settled().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_lifetime_survives_panicking_task() {
        let mut lifetime = Lifetime::new();
        lifetime.wait_until(async { panic!("store write exploded") });
        lifetime.settled().await;
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(AgentEvent::Install.kind().to_string(), "install");
        assert_eq!(
            AgentEvent::NotificationClick { action: None }
                .kind()
                .to_string(),
            "notificationclick"
        );
    }
}
