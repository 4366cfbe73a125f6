// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process cache backend using moka.
//!
//! Each registered collection gets its own moka store bounded by the collection's
//! `local_max_items`. Moka's `TinyLFU` policy evicts least recently used entries and only
//! admits a new entry when it is estimated to be accessed more often than the one it would
//! replace.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use moka::future::Cache;
use stowage_tier::{CacheBackend, Collection, CollectionKey, Error, FOREVER, Registry, Value};
use tick::Clock;

use crate::builder::MemoryCacheBuilder;

#[derive(Debug, Clone)]
struct StoredEntry {
    bytes: Bytes,
    stored_at: SystemTime,
}

#[derive(Debug)]
struct Partition {
    collection: Collection,
    store: Cache<String, StoredEntry>,
}

impl Partition {
    fn is_expired(&self, entry: &StoredEntry, now: SystemTime) -> bool {
        let age = now.duration_since(entry.stored_at).unwrap_or(Duration::ZERO);
        age >= self.collection.effective_ttl()
    }
}

#[derive(Debug)]
struct Inner {
    name: Option<String>,
    clock: Clock,
    initial_capacity: Option<usize>,
    partitions: Registry<Partition>,
}

/// A bounded in-process cache backend.
///
/// Entries are kept in encoded form, the same bytes any other backend would store. Expiry is
/// checked against the configured [`Clock`] on every read, so an entry older than its
/// collection's TTL is never returned even before it has been evicted.
///
/// Clones share the same underlying state.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stowage_memory::MemoryCache;
/// use stowage_tier::{CacheBackend, Collection, Value, ValueType};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let cache = MemoryCache::new(Clock::new_frozen());
/// let names = Collection::new("names", ValueType::String)
///     .with_ttl(Duration::from_secs(60))
///     .with_local_max_items(1_000);
///
/// cache.register(names.clone()).await?;
/// cache.set(&names.key("1"), Value::from("ada")).await?;
/// assert_eq!(cache.get(&names.key("1")).await?, Some(Value::from("ada")));
/// # Ok::<(), stowage_tier::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<Inner>,
}

impl MemoryCache {
    /// Creates a cache with default settings.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::builder(clock).build()
    }

    /// Creates a new builder for configuring an in-process cache.
    #[must_use]
    pub fn builder(clock: Clock) -> MemoryCacheBuilder {
        MemoryCacheBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: MemoryCacheBuilder) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: builder.name,
                clock: builder.clock,
                initial_capacity: builder.initial_capacity,
                partitions: Registry::new(),
            }),
        }
    }

    /// Returns the approximate number of entries held for the collection `name`.
    ///
    /// Moka applies evictions lazily; call [`run_pending_tasks`](Self::run_pending_tasks)
    /// first for an up-to-date count.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the collection is not registered.
    pub fn entry_count(&self, name: &str) -> Result<u64, Error> {
        Ok(self.inner.partitions.get(name)?.store.entry_count())
    }

    /// Performs pending maintenance, such as applying evictions, on every collection.
    pub async fn run_pending_tasks(&self) {
        for (_, partition) in self.inner.partitions.entries() {
            partition.store.run_pending_tasks().await;
        }
    }

    fn build_store(&self, collection: &Collection) -> Cache<String, StoredEntry> {
        let mut builder = Cache::builder();

        if let Some(max_items) = collection.local_max_items() {
            builder = builder.max_capacity(max_items);
        }

        if let Some(capacity) = self.inner.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }

        // moka only keeps wall-clock TTLs for housekeeping; reads still consult `Clock`.
        if let Some(ttl) = collection.ttl() {
            builder = builder.time_to_live(ttl.min(FOREVER));
        }

        match self.inner.name.as_deref() {
            Some(name) => builder.name(&format!("{name}.{}", collection.name())).build(),
            None => builder.name(collection.name()).build(),
        }
    }
}

impl CacheBackend for MemoryCache {
    async fn register(&self, collection: Collection) -> Result<(), Error> {
        self.inner.partitions.ensure_vacant(collection.name())?;

        let store = self.build_store(&collection);
        let name = collection.name().to_owned();
        tracing::info!(
            cache.name = self.inner.name.as_deref().unwrap_or_default(),
            cache.collection = %collection,
            "registered in-memory collection"
        );
        self.inner.partitions.insert(&name, Partition { collection, store })?;
        Ok(())
    }

    async fn set(&self, key: &CollectionKey, value: Value) -> Result<(), Error> {
        let partition = self.inner.partitions.get(key.name())?;
        let entry = StoredEntry {
            bytes: partition.collection.value_type().encode(&value)?,
            stored_at: self.inner.clock.system_time(),
        };
        partition.store.insert(key.key().to_owned(), entry).await;
        Ok(())
    }

    async fn get(&self, key: &CollectionKey) -> Result<Option<Value>, Error> {
        let partition = self.inner.partitions.get(key.name())?;
        let Some(entry) = partition.store.get(key.key()).await else {
            return Ok(None);
        };

        if partition.is_expired(&entry, self.inner.clock.system_time()) {
            partition.store.invalidate(key.key()).await;
            return Ok(None);
        }

        partition.collection.value_type().decode(&entry.bytes).map(Some)
    }

    async fn del(&self, key: &CollectionKey) -> Result<(), Error> {
        let partition = self.inner.partitions.get(key.name())?;
        partition.store.invalidate(key.key()).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        for partition in self.inner.partitions.close() {
            partition.store.invalidate_all();
        }
        Ok(())
    }
}
