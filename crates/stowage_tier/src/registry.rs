// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-backend registration map of collections.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Error, Result};

/// The collections registered with one backend instance, keyed by name.
///
/// Backends store whatever per-collection state they need as `T`, typically the
/// [`Collection`](crate::Collection) itself plus storage handles. The registry enforces the
/// registration rules shared by every backend:
///
/// - a name can be registered at most once,
/// - looking up a name that was never registered is a usage error,
/// - after [`close`](Self::close) every operation is a usage error.
#[derive(Debug)]
pub struct Registry<T> {
    entries: RwLock<Option<HashMap<String, Arc<T>>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Fails if `name` cannot be registered, without registering it.
    ///
    /// Backends call this before provisioning storage so a duplicate registration never
    /// touches the backing store.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the name is empty, already registered, or the registry is closed.
    pub fn ensure_vacant(&self, name: &str) -> Result<()> {
        let guard = self.entries.read();
        let entries = guard.as_ref().ok_or_else(closed)?;
        check_vacant(entries, name)
    }

    /// Registers `entry` under `name`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the name is empty, already registered, or the registry is closed.
    pub fn insert(&self, name: &str, entry: T) -> Result<Arc<T>> {
        let mut guard = self.entries.write();
        let entries = guard.as_mut().ok_or_else(closed)?;
        check_vacant(entries, name)?;

        let entry = Arc::new(entry);
        entries.insert(name.to_owned(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Returns the entry registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the name is not registered or the registry is closed.
    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        let guard = self.entries.read();
        let entries = guard.as_ref().ok_or_else(closed)?;
        entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::usage(format!("collection {name:?} is not registered")))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().as_ref().is_some_and(|entries| entries.contains_key(name))
    }

    /// Returns a snapshot of all registered entries.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Arc<T>)> {
        self.entries.read().as_ref().map_or_else(Vec::new, |entries| {
            entries
                .iter()
                .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
                .collect()
        })
    }

    /// Returns the number of registered collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().as_ref().map_or(0, HashMap::len)
    }

    /// Returns `true` if no collection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.entries.read().is_none()
    }

    /// Closes the registry and returns the entries it held.
    ///
    /// Closing twice is allowed; the second call returns nothing.
    pub fn close(&self) -> Vec<Arc<T>> {
        self.entries
            .write()
            .take()
            .map(|entries| entries.into_values().collect())
            .unwrap_or_default()
    }
}

fn check_vacant<T>(entries: &HashMap<String, Arc<T>>, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::usage("collection name must not be empty"));
    }
    if entries.contains_key(name) {
        return Err(Error::usage(format!("collection {name:?} is already registered")));
    }
    Ok(())
}

fn closed() -> Error {
    Error::usage("the cache has been closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let registry = Registry::new();
        registry.insert("a", 1).unwrap();

        assert_eq!(*registry.get("a").unwrap(), 1);
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_is_usage_error() {
        let registry = Registry::new();
        registry.insert("a", 1).unwrap();

        let err = registry.insert("a", 2).unwrap_err();
        assert!(err.is_fatal());
        assert!(registry.ensure_vacant("a").is_err());
        assert_eq!(*registry.get("a").unwrap(), 1);
    }

    #[test]
    fn empty_name_is_usage_error() {
        let registry = Registry::<i32>::new();
        assert!(registry.insert("", 1).unwrap_err().is_fatal());
    }

    #[test]
    fn unregistered_is_usage_error() {
        let registry = Registry::<i32>::new();
        let err = registry.get("missing").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("\"missing\" is not registered"), "got: {err}");
    }

    #[test]
    fn close_is_idempotent_and_rejects_further_use() {
        let registry = Registry::new();
        registry.insert("a", 1).unwrap();
        registry.insert("b", 2).unwrap();

        assert_eq!(registry.close().len(), 2);
        assert!(registry.close().is_empty());
        assert!(registry.is_closed());
        assert!(registry.is_empty());
        assert!(registry.get("a").unwrap_err().is_fatal());
        assert!(registry.insert("c", 3).unwrap_err().is_fatal());
    }
}
