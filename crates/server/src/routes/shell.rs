//! App shell and offline placeholder pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use super::THEME_COLOR;
use crate::state::AppState;

/// App shell template. The client application mounts into `#root`.
#[derive(Template, WebTemplate)]
#[template(path = "shell.html")]
pub struct ShellTemplate {
    pub app_name: String,
    pub theme_color: &'static str,
    pub agent_url: &'static str,
}

/// Offline placeholder template.
#[derive(Template, WebTemplate)]
#[template(path = "offline.html")]
pub struct OfflineTemplate {
    pub app_name: String,
    pub theme_color: &'static str,
}

/// Serve the app shell.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> ShellTemplate {
    ShellTemplate {
        app_name: state.config().app_name.clone(),
        theme_color: THEME_COLOR,
        agent_url: "/agent.json",
    }
}

/// Serve the offline placeholder.
pub async fn offline(State(state): State<AppState>) -> OfflineTemplate {
    OfflineTemplate {
        app_name: state.config().app_name.clone(),
        theme_color: THEME_COLOR,
    }
}
