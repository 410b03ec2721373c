//! Version-tagged names for cache stores.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a cache name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheNameError {
    #[error("cache name cannot be empty")]
    Empty,
    #[error("cache name cannot contain whitespace: {0:?}")]
    Whitespace(String),
}

/// The name of a cache store, e.g. `app-cache-v2`.
///
/// Names are bumped manually per deployment; the activate transition deletes
/// every store whose name differs from the current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheName(String);

impl CacheName {
    /// Parse and validate a cache name.
    ///
    /// # Errors
    ///
    /// Returns `CacheNameError` if the name is empty or contains whitespace.
    pub fn parse(s: &str) -> Result<Self, CacheNameError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CacheNameError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(CacheNameError::Whitespace(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CacheName {
    type Err = CacheNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CacheName {
    type Error = CacheNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CacheName> for String {
    fn from(name: CacheName) -> Self {
        name.0
    }
}

impl AsRef<str> for CacheName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
