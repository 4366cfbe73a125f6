// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-process caches.

use tick::Clock;

use crate::cache::MemoryCache;

/// Builder for configuring a [`MemoryCache`].
///
/// Per-collection settings (size bound and TTL) come from each registered
/// [`Collection`](stowage_tier::Collection); the builder only holds settings shared by all
/// collections of one cache.
///
/// # Examples
///
/// ```
/// use stowage_memory::MemoryCache;
/// use tick::Clock;
///
/// let cache = MemoryCache::builder(Clock::new_frozen())
///     .initial_capacity(64)
///     .name("lookups")
///     .build();
/// ```
#[derive(Debug)]
pub struct MemoryCacheBuilder {
    pub(crate) clock: Clock,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
}

impl MemoryCacheBuilder {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            initial_capacity: None,
            name: None,
        }
    }

    /// Sets the number of entries each collection pre-allocates room for.
    ///
    /// This is only a hint; collections may grow beyond it up to their size bound.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name for the cache, used in logs and as a prefix of the per-collection store names.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured `MemoryCache`.
    #[must_use]
    pub fn build(self) -> MemoryCache {
        MemoryCache::from_builder(self)
    }
}
