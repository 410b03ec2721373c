//! The resource manifest precached on install.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of the offline placeholder served for failed navigations.
pub const OFFLINE_URL: &str = "/offline.html";

/// Path of the web app manifest.
pub const WEB_APP_MANIFEST_URL: &str = "/manifest.json";

/// Path of the 192px app icon.
pub const ICON_192_URL: &str = "/icons/icon-192x192.png";

/// Path of the 512px app icon.
pub const ICON_512_URL: &str = "/icons/icon-512x512.png";

/// Errors that can occur when building a resource manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("resource manifest cannot be empty")]
    Empty,
    #[error("resource path must start with '/': {0}")]
    NotAbsolute(String),
    #[error("duplicate resource path: {0}")]
    Duplicate(String),
}

/// Fixed, ordered list of paths that must be in the store after install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ResourceManifest(Vec<String>);

impl ResourceManifest {
    /// Build a manifest from paths, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError` if the list is empty, a path is not
    /// root-relative, or a path appears twice.
    pub fn new<I, S>(paths: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for path in paths {
            let path = path.into();
            if !path.starts_with('/') {
                return Err(ManifestError::NotAbsolute(path));
            }
            if out.contains(&path) {
                return Err(ManifestError::Duplicate(path));
            }
            out.push(path);
        }
        if out.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(Self(out))
    }

    /// The first-generation manifest, which also precached the root shell.
    #[must_use]
    pub fn v1() -> Self {
        Self(
            ["/", OFFLINE_URL, WEB_APP_MANIFEST_URL, ICON_192_URL, ICON_512_URL]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    /// The current manifest. Excludes `/` so navigations are never served a
    /// stale shell.
    #[must_use]
    pub fn v2() -> Self {
        Self(
            [OFFLINE_URL, WEB_APP_MANIFEST_URL, ICON_192_URL, ICON_512_URL]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    /// Iterate over the paths in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated manifest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `path` is part of the manifest.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p == path)
    }
}

impl Default for ResourceManifest {
    fn default() -> Self {
        Self::v2()
    }
}

impl TryFrom<Vec<String>> for ResourceManifest {
    type Error = ManifestError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceManifest> for Vec<String> {
    fn from(manifest: ResourceManifest) -> Self {
        manifest.0
    }
}
