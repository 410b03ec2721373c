//! Deferred install prompt and the install banner view-model.
//!
//! The browser offers an install affordance once; the coordinator stashes it
//! in a single slot and hands it out with a take-and-clear, so a handle can
//! only ever be prompted once. The banner is a plain view-model published on
//! a `watch` channel; rendering it is left to the presentation layer.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::InstallPromptError;

/// The user's answer to the native install prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserChoice {
    Accepted,
    Dismissed,
}

/// The browser-supplied install affordance.
#[async_trait]
pub trait DeferredPrompt: Send + Sync {
    /// Suppress the browser's own install UI.
    fn prevent_default(&mut self) {}

    /// Show the native prompt and wait for exactly one decision.
    async fn prompt(&mut self) -> Result<UserChoice, InstallPromptError>;
}

/// A banner button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerAction {
    Later,
    Install,
}

/// What the install banner should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerView {
    pub visible: bool,
    pub title: String,
    pub subtitle: String,
    pub dismiss_label: &'static str,
    pub install_label: &'static str,
}

impl BannerView {
    fn hidden(app_name: &str) -> Self {
        Self {
            visible: false,
            title: format!("Install {app_name}"),
            subtitle: "Add to your home screen for quick access".to_string(),
            dismiss_label: "Later",
            install_label: "Install",
        }
    }
}

/// Owns the deferred prompt slot and the banner state.
pub struct InstallCoordinator {
    slot: Mutex<Option<Box<dyn DeferredPrompt>>>,
    banner: watch::Sender<BannerView>,
}

impl std::fmt::Debug for InstallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallCoordinator")
            .field("has_deferred_prompt", &self.has_deferred_prompt())
            .field("banner", &*self.banner.borrow())
            .finish()
    }
}

impl InstallCoordinator {
    #[must_use]
    pub fn new(app_name: &str) -> Self {
        let (banner, _) = watch::channel(BannerView::hidden(app_name));
        Self {
            slot: Mutex::new(None),
            banner,
        }
    }

    fn take(&self) -> Option<Box<dyn DeferredPrompt>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_visible(&self, visible: bool) {
        self.banner.send_if_modified(|view| {
            let changed = view.visible != visible;
            view.visible = visible;
            changed
        });
    }

    /// Whether a deferred prompt is held.
    #[must_use]
    pub fn has_deferred_prompt(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Current banner state.
    #[must_use]
    pub fn banner(&self) -> BannerView {
        self.banner.borrow().clone()
    }

    /// Observe banner changes.
    #[must_use]
    pub fn subscribe_banner(&self) -> watch::Receiver<BannerView> {
        self.banner.subscribe()
    }

    /// The browser offered an install affordance.
    pub fn on_before_install_prompt(&self, mut prompt: Box<dyn DeferredPrompt>) {
        info!("Install prompt available");
        prompt.prevent_default();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(prompt);
        self.set_visible(true);
    }

    /// The app was installed by any means.
    pub fn on_app_installed(&self) {
        info!("App installed");
        self.set_visible(false);
        drop(self.take());
    }

    /// Show the native prompt if one is held. Returns whether the user
    /// accepted. The held prompt is cleared whatever happens.
    pub async fn prompt_install(&self) -> bool {
        let Some(mut prompt) = self.take() else {
            debug!("Install prompt not available");
            return false;
        };

        let accepted = match prompt.prompt().await {
            Ok(UserChoice::Accepted) => {
                info!("User accepted the install prompt");
                true
            }
            Ok(UserChoice::Dismissed) => {
                info!("User dismissed the install prompt");
                false
            }
            Err(e) => {
                warn!(error = %e, "Install prompt failed");
                false
            }
        };
        self.set_visible(false);
        accepted
    }

    /// Hide the banner. The deferred prompt stays available.
    pub fn dismiss(&self) {
        self.set_visible(false);
    }

    /// Handle a banner button press. Returns whether an install was accepted.
    pub async fn handle(&self, action: BannerAction) -> bool {
        match action {
            BannerAction::Later => {
                self.dismiss();
                false
            }
            BannerAction::Install => self.prompt_install().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedPrompt {
        answer: Result<UserChoice, InstallPromptError>,
        prompts: Arc<AtomicUsize>,
        suppressed: Arc<AtomicUsize>,
    }

    impl ScriptedPrompt {
        fn boxed(answer: Result<UserChoice, InstallPromptError>) -> (Box<Self>, Arc<AtomicUsize>) {
            let prompts = Arc::new(AtomicUsize::new(0));
            let prompt = Box::new(Self {
                answer,
                prompts: Arc::clone(&prompts),
                suppressed: Arc::new(AtomicUsize::new(0)),
            });
            (prompt, prompts)
        }
    }

    #[async_trait]
    impl DeferredPrompt for ScriptedPrompt {
        fn prevent_default(&mut self) {
            self.suppressed.fetch_add(1, Ordering::SeqCst);
        }

        async fn prompt(&mut self) -> Result<UserChoice, InstallPromptError> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[tokio::test]
    async fn test_prompt_without_handle_is_negative() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        assert!(!coordinator.prompt_install().await);
    }

    #[tokio::test]
    async fn test_handle_is_consumed_exactly_once() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let (prompt, prompts) = ScriptedPrompt::boxed(Ok(UserChoice::Accepted));
        coordinator.on_before_install_prompt(prompt);
        assert!(coordinator.banner().visible);

        assert!(coordinator.prompt_install().await);
        assert!(!coordinator.prompt_install().await);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        assert!(!coordinator.has_deferred_prompt());
        assert!(!coordinator.banner().visible);
    }

    #[tokio::test]
    async fn test_dismissed_prompt_is_still_cleared() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let (prompt, _) = ScriptedPrompt::boxed(Ok(UserChoice::Dismissed));
        coordinator.on_before_install_prompt(prompt);

        assert!(!coordinator.prompt_install().await);
        assert!(!coordinator.has_deferred_prompt());
    }

    #[tokio::test]
    async fn test_failed_prompt_is_negative_and_cleared() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let (prompt, _) =
            ScriptedPrompt::boxed(Err(InstallPromptError("not allowed".to_string())));
        coordinator.on_before_install_prompt(prompt);

        assert!(!coordinator.prompt_install().await);
        assert!(!coordinator.has_deferred_prompt());
    }

    #[tokio::test]
    async fn test_app_installed_clears_handle_and_banner() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let (prompt, prompts) = ScriptedPrompt::boxed(Ok(UserChoice::Accepted));
        coordinator.on_before_install_prompt(prompt);

        coordinator.on_app_installed();
        assert!(!coordinator.banner().visible);
        assert!(!coordinator.prompt_install().await);
        assert_eq!(prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_later_hides_banner_but_keeps_handle() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let (prompt, _) = ScriptedPrompt::boxed(Ok(UserChoice::Accepted));
        coordinator.on_before_install_prompt(prompt);

        assert!(!coordinator.handle(BannerAction::Later).await);
        assert!(!coordinator.banner().visible);
        assert!(coordinator.has_deferred_prompt());

        assert!(coordinator.handle(BannerAction::Install).await);
    }

    #[tokio::test]
    async fn test_default_ui_is_suppressed() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let suppressed = Arc::new(AtomicUsize::new(0));
        coordinator.on_before_install_prompt(Box::new(ScriptedPrompt {
            answer: Ok(UserChoice::Dismissed),
            prompts: Arc::new(AtomicUsize::new(0)),
            suppressed: Arc::clone(&suppressed),
        }));
        assert_eq!(suppressed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_banner_copy() {
        let banner = InstallCoordinator::new("RwaDiscount").banner();
        assert!(!banner.visible);
        assert_eq!(banner.title, "Install RwaDiscount");
        assert_eq!(banner.subtitle, "Add to your home screen for quick access");
        assert_eq!(banner.dismiss_label, "Later");
        assert_eq!(banner.install_label, "Install");
    }

    #[tokio::test]
    async fn test_banner_changes_are_published() {
        let coordinator = InstallCoordinator::new("RwaDiscount");
        let mut banner = coordinator.subscribe_banner();
        let (prompt, _) = ScriptedPrompt::boxed(Ok(UserChoice::Accepted));
        coordinator.on_before_install_prompt(prompt);

        banner.changed().await.unwrap();
        assert!(banner.borrow_and_update().visible);
    }
}
