// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock cache backend for testing.
//!
//! This module provides `MockBackend`, an in-memory backend that records all operations and
//! supports failure injection for testing error paths.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{CacheBackend, Collection, CollectionKey, Error, Registry, Value};

/// Recorded cache operation with full context.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOp {
    /// A collection was registered.
    Register(Collection),
    /// A set operation was performed with the given key and value.
    Set {
        /// The key that was written.
        key: CollectionKey,
        /// The value that was written.
        value: Value,
    },
    /// A get operation was performed with the given key.
    Get(CollectionKey),
    /// A del operation was performed with the given key.
    Del(CollectionKey),
    /// The backend was closed.
    Close,
}

type FailPredicate = Box<dyn Fn(&CacheOp) -> bool + Send + Sync>;

/// A configurable mock backend for testing.
///
/// Values are kept in memory without TTL handling. Registration rules are enforced the same
/// way real backends enforce them. Clones share state.
///
/// # Examples
///
/// ```
/// use stowage_tier::testing::{CacheOp, MockBackend};
/// use stowage_tier::{CacheBackend, Collection, Value, ValueType};
///
/// # futures::executor::block_on(async {
/// let cache = MockBackend::new();
/// let users = Collection::new("users", ValueType::String);
/// cache.register(users.clone()).await?;
///
/// cache.fail_when(|op| matches!(op, CacheOp::Get(_)));
/// assert!(cache.get(&users.key("ada")).await.is_err());
///
/// cache.clear_failures();
/// cache.set(&users.key("ada"), Value::from("lovelace")).await?;
/// assert_eq!(cache.get(&users.key("ada")).await?, Some(Value::from("lovelace")));
/// # Ok::<(), stowage_tier::Error>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct MockBackend {
    collections: Arc<Registry<Collection>>,
    data: Arc<Mutex<HashMap<CollectionKey, Value>>>,
    operations: Arc<Mutex<Vec<CacheOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("collections", &self.collections)
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Arc::new(Registry::new()),
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of stored values across all collections.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &CollectionKey) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// Failing operations are still recorded and return a backend error.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: CacheOp, what: &str) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        if fail {
            return Err(Error::backend(format!("mock: {what} failed")));
        }
        Ok(())
    }
}

impl CacheBackend for MockBackend {
    async fn register(&self, collection: Collection) -> Result<(), Error> {
        self.record(CacheOp::Register(collection.clone()), "register")?;
        let name = collection.name().to_owned();
        self.collections.insert(&name, collection)?;
        Ok(())
    }

    async fn set(&self, key: &CollectionKey, value: Value) -> Result<(), Error> {
        self.record(
            CacheOp::Set {
                key: key.clone(),
                value: value.clone(),
            },
            "set",
        )?;
        let collection = self.collections.get(key.name())?;
        collection.value_type().encode(&value)?;
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn get(&self, key: &CollectionKey) -> Result<Option<Value>, Error> {
        self.record(CacheOp::Get(key.clone()), "get")?;
        self.collections.get(key.name())?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn del(&self, key: &CollectionKey) -> Result<(), Error> {
        self.record(CacheOp::Del(key.clone()), "del")?;
        self.collections.get(key.name())?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.record(CacheOp::Close, "close")?;
        self.collections.close();
        self.data.lock().clear();
        Ok(())
    }
}
