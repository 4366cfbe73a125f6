// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The user-facing cache handle with read-through helpers.

use anyspawn::{JoinHandle, Spawner};
use stowage_tier::{CacheBackend, CacheValue, Collection, CollectionKey, DynamicCache, DynamicCacheExt, Error, ErrorKind, Value};
use tick::Clock;

use crate::{CacheConfig, CacheKind, NoCache};

/// A cache handle over any backend, adding read-through and fire-and-forget helpers.
///
/// The backend is type-erased, so code holding a `Cache` does not change when the backend is
/// swapped, for example through [`from_config`](Self::from_config). `Cache` implements
/// [`CacheBackend`] itself by forwarding to the backend.
///
/// Background writes run on a [`Spawner`], Tokio by default, and must be started from within
/// that runtime.
///
/// Clones share the same backend.
///
/// # Examples
///
/// ```
/// use stowage::{Cache, CacheBackend, Collection, NoCache, ValueType};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), stowage::Error> {
///
/// let cache = Cache::new(NoCache::new());
/// let users = Collection::new("users", ValueType::String);
/// cache.register(users.clone()).await?;
///
/// let name: String = cache
///     .get_or_set(&users.key("42"), |_| async { Ok::<_, std::io::Error>("ada".to_owned()) })
///     .await?;
/// assert_eq!(name, "ada");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Cache {
    backend: DynamicCache,
    spawner: Spawner,
}

impl Cache {
    /// Wraps `backend` in a cache handle.
    #[must_use]
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: backend.into_dynamic(),
            spawner: Spawner::new_tokio(),
        }
    }

    /// Creates a cache with the backend selected by `config`.
    #[must_use]
    pub fn from_config(config: &CacheConfig, clock: Clock) -> Self {
        match config.kind {
            CacheKind::None => {
                drop(clock);
                Self::new(NoCache::new())
            }
            #[cfg(feature = "memory")]
            CacheKind::Memory => {
                let mut builder = stowage_memory::MemoryCache::builder(clock);
                if let Some(name) = &config.name {
                    builder = builder.name(name.as_str());
                }
                if let Some(capacity) = config.initial_capacity {
                    builder = builder.initial_capacity(capacity);
                }
                Self::new(builder.build())
            }
        }
    }

    /// Sets the spawner running background writes.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    /// Returns the type-erased backend.
    #[must_use]
    pub fn backend(&self) -> &DynamicCache {
        &self.backend
    }

    /// Returns the cached value for `key`, or fetches, caches and returns it on a miss.
    ///
    /// A backend failure while reading is logged and handled like a miss, so an unavailable
    /// cache degrades to calling `fetch`. The fetched value is written in the background; a
    /// failed write is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`Fetch`](ErrorKind::Fetch) error wrapping the error of `fetch`, in which case
    /// nothing is cached, or a [`Usage`](ErrorKind::Usage) error if the collection is not
    /// registered or holds a different type than `T`.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &CollectionKey, fetch: F) -> Result<T, Error>
    where
        T: CacheValue + Clone,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: FnOnce(&CollectionKey) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(value)) => return value.into_typed(),
            Ok(None) => {}
            Err(e) if e.kind() == ErrorKind::Usage => return Err(e),
            Err(e) => tracing::warn!(cache.key = %key, error = %e, "cache read failed, fetching instead"),
        }

        let value = fetch(key).await.map_err(Error::fetch)?;
        drop(self.set_async(key, value.clone()));
        Ok(value)
    }

    /// Writes `value` under `key` in the background.
    ///
    /// The returned handle can be awaited for the outcome or dropped; the write completes
    /// either way. Failures are logged.
    pub fn set_async(&self, key: &CollectionKey, value: impl CacheValue) -> JoinHandle<Result<(), Error>> {
        let backend = self.backend.clone();
        let key = key.clone();
        let value = value.into_value();

        self.spawner.spawn(async move {
            let result = match value {
                Ok(value) => backend.set(&key, value).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                tracing::warn!(cache.key = %key, error = %e, "failed to write to cache");
            }
            result
        })
    }

    /// Deletes `key` in the background.
    ///
    /// The returned handle can be awaited for the outcome or dropped; the deletion completes
    /// either way. Failures are logged.
    pub fn del_async(&self, key: &CollectionKey) -> JoinHandle<Result<(), Error>> {
        let backend = self.backend.clone();
        let key = key.clone();

        self.spawner.spawn(async move {
            let result = backend.del(&key).await;
            if let Err(e) = &result {
                tracing::warn!(cache.key = %key, error = %e, "failed to delete from cache");
            }
            result
        })
    }
}

impl CacheBackend for Cache {
    async fn register(&self, collection: Collection) -> Result<(), Error> {
        self.backend.register(collection).await
    }

    async fn set(&self, key: &CollectionKey, value: Value) -> Result<(), Error> {
        self.backend.set(key, value).await
    }

    async fn get(&self, key: &CollectionKey) -> Result<Option<Value>, Error> {
        self.backend.get(key).await
    }

    async fn del(&self, key: &CollectionKey) -> Result<(), Error> {
        self.backend.del(key).await
    }

    async fn close(&self) -> Result<(), Error> {
        self.backend.close().await
    }
}
