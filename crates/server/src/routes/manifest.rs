//! Web app manifest route handler.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use rwa_discount_core::{ICON_192_URL, ICON_512_URL};
use serde::Serialize;

use super::{BACKGROUND_COLOR, THEME_COLOR};
use crate::error::AppError;
use crate::state::AppState;

/// The web app manifest document.
#[derive(Debug, Serialize)]
pub struct WebAppManifest {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub icons: Vec<ManifestIcon>,
    pub theme_color: &'static str,
    pub background_color: &'static str,
    pub display: &'static str,
    pub start_url: &'static str,
    pub scope: &'static str,
}

/// One manifest icon.
#[derive(Debug, Serialize)]
pub struct ManifestIcon {
    pub src: &'static str,
    pub sizes: &'static str,
    #[serde(rename = "type")]
    pub mime: &'static str,
    pub purpose: &'static str,
}

impl WebAppManifest {
    /// Manifest for the named app.
    #[must_use]
    pub fn for_app(app_name: &str) -> Self {
        Self {
            name: format!("{app_name} - Local Deals"),
            short_name: app_name.to_string(),
            description: "Discover discounts from local merchants".to_string(),
            icons: vec![
                ManifestIcon {
                    src: ICON_192_URL,
                    sizes: "192x192",
                    mime: "image/png",
                    purpose: "any maskable",
                },
                ManifestIcon {
                    src: ICON_512_URL,
                    sizes: "512x512",
                    mime: "image/png",
                    purpose: "any maskable",
                },
            ],
            theme_color: THEME_COLOR,
            background_color: BACKGROUND_COLOR,
            display: "standalone",
            start_url: "/",
            scope: "/",
        }
    }
}

/// Serve the web app manifest.
pub async fn webmanifest(State(state): State<AppState>) -> Result<Response, AppError> {
    let manifest = WebAppManifest::for_app(&state.config().app_name);
    let body = serde_json::to_string(&manifest)?;

    Ok((
        [(header::CONTENT_TYPE, "application/manifest+json")],
        body,
    )
        .into_response())
}
