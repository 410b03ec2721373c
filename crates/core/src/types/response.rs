//! Response snapshots returned by the network or a cache store.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Where a response may be exposed to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Same-origin response.
    #[default]
    Basic,
    /// Cross-origin response with CORS headers.
    Cors,
    /// Cross-origin response without CORS; status and body are hidden.
    Opaque,
}

/// An immutable response snapshot.
///
/// The body is reference counted, so cloning a response to hand one copy to
/// the page and write another into a store does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub url: Option<Url>,
    pub response_type: ResponseType,
}

impl FetchResponse {
    /// Build a same-origin response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            url: None,
            response_type: ResponseType::Basic,
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the final response URL.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Set the response type.
    #[must_use]
    pub const fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Whether this response may be written into a store opportunistically:
    /// exactly 200 and same-origin.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheable_requires_200_basic() {
        assert!(FetchResponse::new(200, "ok").is_cacheable());
        assert!(!FetchResponse::new(204, "").is_cacheable());
        assert!(
            !FetchResponse::new(200, "ok")
                .with_type(ResponseType::Cors)
                .is_cacheable()
        );
    }

    #[test]
    fn test_success_range() {
        assert!(FetchResponse::new(204, "").is_success());
        assert!(!FetchResponse::new(404, "").is_success());
        assert!(!FetchResponse::new(302, "").is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = FetchResponse::new(200, "").with_header("Content-Type", "text/css");
        assert_eq!(response.header("content-type"), Some("text/css"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn test_clone_shares_body() {
        let response = FetchResponse::new(200, vec![1_u8; 64]);
        let copy = response.clone();
        assert_eq!(response.body.as_ptr(), copy.body.as_ptr());
    }
}
