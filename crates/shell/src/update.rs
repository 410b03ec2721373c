//! Update notification: ask the user to reload when a new version is
//! installed while an older one still controls the page.

use std::sync::Arc;

use async_trait::async_trait;
use rwa_discount_agent::{AgentHost, RegistrationEvent};
use rwa_discount_core::{ClientId, WorkerState};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{AppEvent, AppEvents};

/// The presentation layer's update prompt.
#[async_trait]
pub trait UpdatePrompt: Send + Sync {
    /// Ask the user; `true` means reload now.
    async fn confirm(&self, message: &str) -> bool;

    /// The page was reloaded onto the new version.
    async fn reloaded(&self) {}
}

/// Text of the update prompt.
#[must_use]
pub fn update_message(app_name: &str) -> String {
    format!(
        "A new version of {app_name} is available! Would you like to refresh to get the latest features?"
    )
}

/// Watch registration events for `client` and prompt on every new version
/// that installs while the page is controlled by an older one.
pub fn watch_updates(
    mut registration: broadcast::Receiver<RegistrationEvent>,
    host: AgentHost,
    client: ClientId,
    prompt: Arc<dyn UpdatePrompt>,
    events: AppEvents,
    app_name: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let message = update_message(&app_name);
        loop {
            match registration.recv().await {
                Ok(RegistrationEvent::StateChange {
                    worker,
                    state: WorkerState::Installed,
                    active: Some(_),
                }) if host.controller(client).is_some() => {
                    info!(worker = %worker, "New version installed, update available");
                    events.emit(AppEvent::UpdateAvailable { worker });
                    if prompt.confirm(&message).await {
                        match host.reload(client) {
                            Ok(()) => prompt.reloaded().await,
                            Err(e) => warn!(error = %e, "Reload failed"),
                        }
                    }
                }
                Ok(RegistrationEvent::Unregistered) | Err(RecvError::Closed) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Registration events dropped");
                }
            }
        }
        debug!("Update watcher stopped");
    })
}
