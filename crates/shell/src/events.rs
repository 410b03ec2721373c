//! Application-level events raised by the page controller.

use rwa_discount_core::{Connectivity, WorkerId};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const APP_EVENT_CAPACITY: usize = 32;

/// Events the rest of the application can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Connectivity changed (also sent once on startup).
    NetworkStatusChange { is_online: bool },
    /// A new agent version is installed while an older one controls the page.
    UpdateAvailable { worker: WorkerId },
}

/// Broadcast bus for [`AppEvent`]s.
#[derive(Debug, Clone)]
pub struct AppEvents {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for AppEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(APP_EVENT_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no listeners is not an error.
    pub fn emit(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

/// Broadcast the current connectivity, then every change, until the
/// connectivity source goes away.
pub fn watch_network_status(
    mut connectivity: watch::Receiver<Connectivity>,
    events: AppEvents,
) -> JoinHandle<()> {
    let initial = *connectivity.borrow_and_update();
    announce(&events, initial);

    tokio::spawn(async move {
        while connectivity.changed().await.is_ok() {
            let current = *connectivity.borrow_and_update();
            announce(&events, current);
        }
        debug!("Connectivity source closed");
    })
}

fn announce(events: &AppEvents, connectivity: Connectivity) {
    let is_online = connectivity.is_online();
    info!(is_online, "Network status");
    events.emit(AppEvent::NetworkStatusChange { is_online });
}
