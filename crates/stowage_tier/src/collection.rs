// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Named cache partitions and the keys that address them.

use std::fmt;
use std::time::Duration;

use crate::ValueType;

/// The time-to-live used for collections registered without one.
///
/// Entries of such collections never expire in practice, but every backend can still apply
/// the same aging logic.
pub const FOREVER: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A named, independently configured partition of a cache.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stowage_tier::{Collection, ValueType};
///
/// let sessions = Collection::new("sessions", ValueType::Object)
///     .with_ttl(Duration::from_secs(300))
///     .with_local_max_items(10_000);
///
/// assert_eq!(sessions.name(), "sessions");
/// assert_eq!(sessions.ttl(), Some(Duration::from_secs(300)));
/// assert_eq!(sessions.local_max_items(), Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    name: String,
    ttl: Option<Duration>,
    value_type: ValueType,
    local_max_items: u64,
}

impl Collection {
    /// Creates a collection without a TTL and without an in-process size bound.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            value_type,
            local_max_items: 0,
        }
    }

    /// Sets the time-to-live of entries. A zero duration means entries never expire.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Bounds the number of entries the in-process backend keeps. Zero means unbounded.
    ///
    /// Other backends ignore this setting.
    #[must_use]
    pub fn with_local_max_items(mut self, max_items: u64) -> Self {
        self.local_max_items = max_items;
        self
    }

    /// The unique name of the collection.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured time-to-live, or `None` if entries never expire.
    #[must_use]
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The time-to-live to apply, substituting [`FOREVER`] when none is configured.
    #[must_use]
    pub fn effective_ttl(&self) -> Duration {
        self.ttl.unwrap_or(FOREVER)
    }

    /// The type of values stored in this collection.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The in-process size bound, or `None` if unbounded.
    #[must_use]
    pub const fn local_max_items(&self) -> Option<u64> {
        match self.local_max_items {
            0 => None,
            n => Some(n),
        }
    }

    /// Builds a key addressing `key` inside this collection.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> CollectionKey {
        CollectionKey::new(self.name.clone(), key)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{name={} ttl=", self.name)?;
        match self.ttl {
            Some(ttl) => write!(f, "{ttl:?}")?,
            None => f.write_str("forever")?,
        }
        write!(f, " valueType={} localMaxItems={}}}", self.value_type, self.local_max_items)
    }
}

/// The address of one cached value: a collection name and a key within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    name: String,
    key: String,
}

impl CollectionKey {
    /// Creates a key for `key` in the collection called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    /// The collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key within the collection.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{Name={} Key={}}}", self.name, self.key)
    }
}
