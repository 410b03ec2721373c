//! Router middleware.
//!
//! Sentry layers wrap everything (added by the binary), then `TraceLayer`,
//! then [`request_id_middleware`], which fills the span's `request_id`.

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
