//! Caching agent for RwaDiscount.
//!
//! The agent owns one versioned cache store per deployment. It precaches a
//! fixed resource manifest on install, deletes every other store on
//! activate, and routes fetches network-first (navigations), network-only
//! (backend traffic) or cache-first (everything else).
//!
//! [`AgentHost`] plays the browser's part: it detects new versions by their
//! descriptor bytes, serializes lifecycle events and tracks which pages each
//! version controls.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod host;
pub mod network;
pub mod notification;
pub mod storage;
pub mod strategy;

pub use agent::{BACKGROUND_SYNC_TAG, CachingAgent};
pub use config::{AgentConfig, DEFAULT_INSTALL_FETCH_TIMEOUT, DEFAULT_SCOPE};
pub use error::{AgentError, HostError, NetworkError, StorageError};
pub use event::{
    ActivateReport, AgentEvent, Dispatched, EventKind, EventOutcome, FetchOutcome, InstallReport,
    Lifetime, ResponseSource,
};
pub use host::{AgentHost, HostOptions, Registration, RegistrationEvent, Served, WorkerInfo};
pub use network::{ConnectivityGate, DEFAULT_HTTP_TIMEOUT, HttpNetwork, MemoryNetwork, Network};
pub use notification::{Notification, NotificationAction, NotificationClick, NotificationData};
pub use storage::{CacheStorage, MemoryCacheStorage};
