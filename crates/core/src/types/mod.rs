//! Core types for RwaDiscount.
//!
//! This module provides type-safe wrappers for the offline caching domain.

pub mod cache_name;
pub mod descriptor;
pub mod id;
pub mod manifest;
pub mod request;
pub mod response;
pub mod status;

pub use cache_name::{CacheName, CacheNameError};
pub use descriptor::{
    AgentDescriptor, DEFAULT_APP_NAME, DEFAULT_ASSET_EXTENSIONS, DEFAULT_BYPASS_DOMAINS,
    DEFAULT_CACHE_NAME,
};
pub use id::*;
pub use manifest::{
    ICON_192_URL, ICON_512_URL, ManifestError, OFFLINE_URL, ResourceManifest, WEB_APP_MANIFEST_URL,
};
pub use request::{FetchRequest, Method, RequestKey, RequestMode};
pub use response::{FetchResponse, ResponseType};
pub use status::*;
