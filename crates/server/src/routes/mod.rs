//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                 - App shell
//! GET  /offline.html     - Offline placeholder
//! GET  /manifest.json    - Web app manifest
//! GET  /agent.json       - Caching agent descriptor
//! ```
//!
//! `/icons/*` and `/health` are mounted in [`crate::app`].

pub mod agent;
pub mod manifest;
pub mod shell;

use axum::{Router, http::Uri, routing::get};

use crate::error::AppError;
use crate::state::AppState;

/// Theme color shared by the pages and the web app manifest.
pub const THEME_COLOR: &str = "#2563eb";

/// Background color of the installed app's splash screen.
pub const BACKGROUND_COLOR: &str = "#ffffff";

/// Create the page routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shell::index))
        .route("/offline.html", get(shell::offline))
        .route("/manifest.json", get(manifest::webmanifest))
        .route("/agent.json", get(agent::descriptor))
}

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
