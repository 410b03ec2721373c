//! Named cache stores.
//!
//! A [`CacheStorage`] holds any number of stores keyed by [`CacheName`]. Only
//! the install transition creates stores and only the activate transition
//! deletes them; the fetch path may add entries to the current store.
//!
//! [`MemoryCacheStorage`] backs each store with an unbounded `moka` cache (no
//! TTL, no capacity bound) so readers never block writers.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use rwa_discount_core::{CacheName, FetchResponse, RequestKey};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;

/// The set of named cache stores for one scope.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if it does not exist.
    async fn open(&self, name: &CacheName) -> Result<(), StorageError>;

    /// Whether a store exists.
    async fn has(&self, name: &CacheName) -> Result<bool, StorageError>;

    /// Names of all stores, in creation order.
    async fn keys(&self) -> Result<Vec<CacheName>, StorageError>;

    /// Delete a store. Returns whether it existed.
    async fn delete(&self, name: &CacheName) -> Result<bool, StorageError>;

    /// Look up a response in one store.
    async fn match_in(
        &self,
        name: &CacheName,
        key: &RequestKey,
    ) -> Result<Option<FetchResponse>, StorageError>;

    /// Store (or overwrite) one entry.
    async fn put(
        &self,
        name: &CacheName,
        key: RequestKey,
        response: FetchResponse,
    ) -> Result<(), StorageError>;

    /// Store a batch of entries so readers see either none or all of them.
    async fn put_all(
        &self,
        name: &CacheName,
        entries: Vec<(RequestKey, FetchResponse)>,
    ) -> Result<(), StorageError>;

    /// Keys stored in one store, sorted.
    async fn entries(&self, name: &CacheName) -> Result<Vec<RequestKey>, StorageError>;
}

#[async_trait]
impl<T: CacheStorage + ?Sized> CacheStorage for Arc<T> {
    async fn open(&self, name: &CacheName) -> Result<(), StorageError> {
        (**self).open(name).await
    }

    async fn has(&self, name: &CacheName) -> Result<bool, StorageError> {
        (**self).has(name).await
    }

    async fn keys(&self) -> Result<Vec<CacheName>, StorageError> {
        (**self).keys().await
    }

    async fn delete(&self, name: &CacheName) -> Result<bool, StorageError> {
        (**self).delete(name).await
    }

    async fn match_in(
        &self,
        name: &CacheName,
        key: &RequestKey,
    ) -> Result<Option<FetchResponse>, StorageError> {
        (**self).match_in(name, key).await
    }

    async fn put(
        &self,
        name: &CacheName,
        key: RequestKey,
        response: FetchResponse,
    ) -> Result<(), StorageError> {
        (**self).put(name, key, response).await
    }

    async fn put_all(
        &self,
        name: &CacheName,
        entries: Vec<(RequestKey, FetchResponse)>,
    ) -> Result<(), StorageError> {
        (**self).put_all(name, entries).await
    }

    async fn entries(&self, name: &CacheName) -> Result<Vec<RequestKey>, StorageError> {
        (**self).entries(name).await
    }
}

type Store = Cache<RequestKey, FetchResponse>;

/// In-memory cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    // Vec keeps creation order, matching how stores are enumerated.
    stores: RwLock<Vec<(CacheName, Store)>>,
}

impl MemoryCacheStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn store(&self, name: &CacheName) -> Result<Store, StorageError> {
        self.stores
            .read()
            .await
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, store)| store.clone())
            .ok_or_else(|| StorageError::NotFound(name.clone()))
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &CacheName) -> Result<(), StorageError> {
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|(n, _)| n == name) {
            debug!(cache = %name, "Creating cache store");
            stores.push((name.clone(), Cache::builder().build()));
        }
        Ok(())
    }

    async fn has(&self, name: &CacheName) -> Result<bool, StorageError> {
        Ok(self.stores.read().await.iter().any(|(n, _)| n == name))
    }

    async fn keys(&self) -> Result<Vec<CacheName>, StorageError> {
        Ok(self
            .stores
            .read()
            .await
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    async fn delete(&self, name: &CacheName) -> Result<bool, StorageError> {
        let mut stores = self.stores.write().await;
        let Some(index) = stores.iter().position(|(n, _)| n == name) else {
            return Ok(false);
        };
        let (_, store) = stores.remove(index);
        store.invalidate_all();
        Ok(true)
    }

    async fn match_in(
        &self,
        name: &CacheName,
        key: &RequestKey,
    ) -> Result<Option<FetchResponse>, StorageError> {
        match self.store(name).await {
            Ok(store) => Ok(store.get(key).await),
            // A missing store simply has no entries.
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put(
        &self,
        name: &CacheName,
        key: RequestKey,
        response: FetchResponse,
    ) -> Result<(), StorageError> {
        let store = self.store(name).await?;
        store.insert(key, response).await;
        Ok(())
    }

    async fn put_all(
        &self,
        name: &CacheName,
        entries: Vec<(RequestKey, FetchResponse)>,
    ) -> Result<(), StorageError> {
        // Holding the write lock keeps readers out until the batch is complete.
        let stores = self.stores.write().await;
        let store = stores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, store)| store)
            .ok_or_else(|| StorageError::NotFound(name.clone()))?;
        for (key, response) in entries {
            store.insert(key, response).await;
        }
        Ok(())
    }

    async fn entries(&self, name: &CacheName) -> Result<Vec<RequestKey>, StorageError> {
        let store = self.store(name).await?;
        let mut keys: Vec<RequestKey> = store.iter().map(|(k, _)| (*k).clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
