//! Page controller for RwaDiscount.
//!
//! Bridges browser-level app signals to application-level events without
//! owning any caching logic: registers the caching agent in production
//! builds, prompts the user when a new version is installed, holds the
//! deferred install prompt, and broadcasts connectivity changes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod events;
pub mod install;
pub mod registration;
pub mod update;

pub use config::ShellConfig;
pub use controller::{PageController, PageEnvironment};
pub use display::{Capabilities, DisplayContext, DisplayMode, can_install, is_standalone};
pub use error::{ConfigError, InstallPromptError, RegistrationError};
pub use events::{AppEvent, AppEvents, watch_network_status};
pub use install::{BannerAction, BannerView, DeferredPrompt, InstallCoordinator, UserChoice};
pub use registration::{RegistrationHandle, register, unregister};
pub use update::{UpdatePrompt, update_message, watch_updates};
