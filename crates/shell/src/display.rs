//! Display-mode and install-capability detection.

use serde::{Deserialize, Serialize};

/// How the page is being displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Browser,
    MinimalUi,
    Standalone,
    Fullscreen,
}

/// What the page can observe about how it was launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayContext {
    pub display_mode: DisplayMode,
    /// iOS home-screen flag.
    pub navigator_standalone: bool,
    pub referrer: Option<String>,
}

/// Features the environment supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// A caching agent can be registered.
    pub agents: bool,
    /// The environment fires the before-install signal.
    pub install_prompt: bool,
}

impl Capabilities {
    /// Everything supported.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            agents: true,
            install_prompt: true,
        }
    }
}

/// Whether the app is running as an installed app.
#[must_use]
pub fn is_standalone(context: &DisplayContext) -> bool {
    context.display_mode == DisplayMode::Standalone
        || context.navigator_standalone
        || context
            .referrer
            .as_deref()
            .is_some_and(|r| r.contains("android-app://"))
}

/// Whether an install prompt can ever be offered.
#[must_use]
pub const fn can_install(capabilities: Capabilities) -> bool {
    capabilities.install_prompt
}
