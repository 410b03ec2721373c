//! Caching agent descriptor.
//!
//! Hosts fetch this document to register the agent and to check for updates.
//! It must never be served stale, and it may control the whole origin.

use axum::{
    Extension,
    extract::State,
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::middleware::RequestId;
use crate::state::AppState;

/// Lets an agent fetched from here control `/`.
pub const SERVICE_WORKER_ALLOWED: HeaderName = HeaderName::from_static("service-worker-allowed");

/// Serve the descriptor bytes.
pub async fn descriptor(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    debug!(
        request_id = request_id.as_ref().map(|Extension(id)| id.as_str()),
        cache = %state.descriptor().cache_name,
        "Agent descriptor requested"
    );
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-cache"),
            (SERVICE_WORKER_ALLOWED, "/"),
        ],
        state.descriptor_bytes(),
    )
        .into_response()
}
