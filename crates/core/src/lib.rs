//! RwaDiscount Core - Shared types library.
//!
//! This crate provides common types used across all RwaDiscount components:
//! - `agent` - The caching agent that intercepts page fetches
//! - `shell` - The page controller that registers the agent and surfaces PWA signals
//! - `server` - The origin server for the app shell and agent descriptor
//! - `cli` - Command-line tools for inspecting and simulating the agent
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O, no
//! HTTP clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Cache names, request/response snapshots, the resource manifest,
//!   the agent descriptor and worker lifecycle states

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
