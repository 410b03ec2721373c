//! Fetch routing: decide how a request is answered before it reaches the network.

use rwa_discount_core::{FetchRequest, Method};
use url::Url;

use crate::config::AgentConfig;

/// Response strategy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: the request goes to the network exactly as issued.
    Passthrough,
    /// Live network first, offline placeholder on failure.
    NetworkFirst,
    /// Always the network, never the store, no fallback.
    NetworkOnly,
    /// Store first, then network with opportunistic write-back.
    CacheFirst,
}

/// Pick the strategy for a request. First match wins:
///
/// 1. non-GET requests pass through
/// 2. non-http(s) schemes (e.g. `chrome-extension:`) pass through
/// 3. navigations are network-first
/// 4. bypassed backend domains are network-only
/// 5. everything else is cache-first
#[must_use]
pub fn route(request: &FetchRequest, config: &AgentConfig) -> Route {
    if request.method != Method::Get {
        return Route::Passthrough;
    }
    if !matches!(request.url.scheme(), "http" | "https") {
        return Route::Passthrough;
    }
    if request.is_navigation() {
        return Route::NetworkFirst;
    }
    if is_bypassed(&request.url, &config.bypass_domains) {
        return Route::NetworkOnly;
    }
    Route::CacheFirst
}

/// Whether the URL contains any of the bypassed domain substrings.
#[must_use]
pub fn is_bypassed(url: &Url, domains: &[String]) -> bool {
    let url = url.as_str();
    domains
        .iter()
        .any(|domain| !domain.is_empty() && url.contains(domain.as_str()))
}

/// Whether the URL ends in `.` plus an allow-listed extension.
///
/// The whole URL (query included, fragment excluded) is matched, case
/// sensitively: `/app.js?v=3` and `/LOGO.PNG` are not written back.
#[must_use]
pub fn is_static_asset(url: &Url, extensions: &[String]) -> bool {
    let full = url.as_str();
    let full = full.split_once('#').map_or(full, |(before, _)| before);
    extensions.iter().any(|ext| {
        !ext.is_empty()
            && full
                .strip_suffix(ext.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rwa_discount_core::RequestMode;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn config() -> AgentConfig {
        AgentConfig::default()
    }

    #[test]
    fn test_non_get_passes_through() {
        for method in [Method::Post, Method::Put, Method::Delete, Method::Head] {
            let request =
                FetchRequest::get(url("http://localhost:3000/app.js")).with_method(method);
            assert_eq!(route(&request, &config()), Route::Passthrough);
        }
    }

    #[test]
    fn test_non_get_navigation_passes_through() {
        let request = FetchRequest::navigate(url("http://localhost:3000/login"))
            .with_method(Method::Post);
        assert_eq!(route(&request, &config()), Route::Passthrough);
    }

    #[test]
    fn test_extension_scheme_passes_through() {
        let request = FetchRequest::get(url("chrome-extension://abcdef/content.js"));
        assert_eq!(route(&request, &config()), Route::Passthrough);
    }

    #[test]
    fn test_navigation_is_network_first() {
        let request = FetchRequest::navigate(url("http://localhost:3000/"));
        assert_eq!(route(&request, &config()), Route::NetworkFirst);
    }

    #[test]
    fn test_navigation_to_backend_is_still_network_first() {
        let request = FetchRequest::navigate(url("https://project.supabase.co/auth/v1/callback"));
        assert_eq!(route(&request, &config()), Route::NetworkFirst);
    }

    #[test]
    fn test_backend_is_network_only() {
        let request = FetchRequest::get(url("https://project.supabase.co/rest/v1/deals?select=*"))
            .with_mode(RequestMode::Cors);
        assert_eq!(route(&request, &config()), Route::NetworkOnly);
    }

    #[test]
    fn test_backend_asset_is_network_only() {
        let request =
            FetchRequest::get(url("https://project.supabase.co/storage/v1/object/deal.png"));
        assert_eq!(route(&request, &config()), Route::NetworkOnly);
    }

    #[test]
    fn test_everything_else_is_cache_first() {
        let request = FetchRequest::get(url("http://localhost:3000/assets/index-abc.js"));
        assert_eq!(route(&request, &config()), Route::CacheFirst);
        let request = FetchRequest::get(url("http://localhost:3000/api/ping"));
        assert_eq!(route(&request, &config()), Route::CacheFirst);
    }

    #[test]
    fn test_static_asset_extensions() {
        let exts = config().asset_extensions;
        for path in [
            "/a.js", "/a.css", "/a.png", "/a.jpg", "/a.jpeg", "/a.svg", "/a.gif", "/a.woff",
            "/a.woff2", "/a.ttf", "/a.eot", "/fonts/inter.woff2#v", "/search?q=logo.png",
        ] {
            let u = url("http://localhost:3000/").join(path).unwrap();
            assert!(is_static_asset(&u, &exts), "{path} should be static");
        }
        for path in [
            "/", "/deals", "/data.json", "/offline.html", "/js/", "/a.jsx", "/A.PNG",
            "/a.js?v=3", "/apng",
        ] {
            let u = url("http://localhost:3000/").join(path).unwrap();
            assert!(!is_static_asset(&u, &exts), "{path} should not be static");
        }
    }

    #[test]
    fn test_empty_bypass_domain_never_matches() {
        assert!(!is_bypassed(
            &url("http://localhost:3000/"),
            &[String::new()]
        ));
    }
}
