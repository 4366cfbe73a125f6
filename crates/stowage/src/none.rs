// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A backend that stores nothing.

use std::sync::Arc;

use stowage_tier::{CacheBackend, Collection, CollectionKey, Error, Registry, Value};

/// A cache backend that never stores anything.
///
/// Collections are still registered and checked, so code exercised against `NoCache` fails
/// the same way on an unregistered collection or a mistyped value as it would against a
/// real backend. Every `get` is a miss.
///
/// Use it to switch caching off without touching call sites.
///
/// # Examples
///
/// ```
/// use stowage::{CacheBackend, Collection, NoCache, Value, ValueType};
/// # futures::executor::block_on(async {
///
/// let cache = NoCache::new();
/// let names = Collection::new("names", ValueType::String);
/// cache.register(names.clone()).await?;
///
/// cache.set(&names.key("1"), Value::from("ada")).await?;
/// assert_eq!(cache.get(&names.key("1")).await?, None);
/// # Ok::<(), stowage::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct NoCache {
    collections: Arc<Registry<Collection>>,
}

impl NoCache {
    /// Creates a backend with no registered collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for NoCache {
    async fn register(&self, collection: Collection) -> Result<(), Error> {
        let name = collection.name().to_owned();
        tracing::debug!(cache.collection = %collection, "registered collection without storage");
        self.collections.insert(&name, collection)?;
        Ok(())
    }

    async fn set(&self, key: &CollectionKey, value: Value) -> Result<(), Error> {
        let collection = self.collections.get(key.name())?;
        collection.value_type().encode(&value)?;
        Ok(())
    }

    async fn get(&self, key: &CollectionKey) -> Result<Option<Value>, Error> {
        self.collections.get(key.name())?;
        Ok(None)
    }

    async fn del(&self, key: &CollectionKey) -> Result<(), Error> {
        self.collections.get(key.name())?;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.collections.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stowage_tier::{ErrorKind, ValueType};

    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn every_read_misses() {
        block_on(async {
            let cache = NoCache::new();
            let counters = Collection::new("counters", ValueType::Int64);
            cache.register(counters.clone()).await.expect("register failed");

            cache.set(&counters.key("a"), Value::Int64(1)).await.expect("set failed");
            assert_eq!(cache.get(&counters.key("a")).await.expect("get failed"), None);
            cache.del(&counters.key("a")).await.expect("del failed");
        });
    }

    #[test]
    fn enforces_registration_rules() {
        block_on(async {
            let cache = NoCache::new();
            let counters = Collection::new("counters", ValueType::Int64);
            cache.register(counters.clone()).await.expect("register failed");

            let duplicate = cache.register(counters.clone()).await.expect_err("duplicate should fail");
            assert_eq!(duplicate.kind(), ErrorKind::Usage);

            let unknown = Collection::new("unknown", ValueType::Int64).key("a");
            assert_eq!(cache.get(&unknown).await.expect_err("get").kind(), ErrorKind::Usage);
            assert_eq!(cache.del(&unknown).await.expect_err("del").kind(), ErrorKind::Usage);
        });
    }

    #[test]
    fn rejects_mistyped_values() {
        block_on(async {
            let cache = NoCache::new();
            let counters = Collection::new("counters", ValueType::Int64);
            cache.register(counters.clone()).await.expect("register failed");

            let error = cache
                .set(&counters.key("a"), Value::from("one"))
                .await
                .expect_err("string into int64 collection should fail");
            assert_eq!(error.kind(), ErrorKind::Usage);
        });
    }

    #[test]
    fn close_is_idempotent() {
        block_on(async {
            let cache = NoCache::new();
            cache.close().await.expect("close failed");
            cache.close().await.expect("second close failed");

            let error = cache
                .register(Collection::new("late", ValueType::String))
                .await
                .expect_err("register after close should fail");
            assert_eq!(error.kind(), ErrorKind::Usage);
        });
    }
}
