// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime selection of a backend through type erasure.

use std::{fmt, sync::Arc};

use crate::{CacheBackend, Collection, CollectionKey, Error, Value, backend::DynCacheBackend};

/// Converts any [`CacheBackend`] into a [`DynamicCache`].
///
/// Implemented for every `'static` backend.
///
/// # Examples
///
/// ```
/// use stowage_tier::{CacheBackend, DynamicCache, DynamicCacheExt};
///
/// fn pick(fast: impl CacheBackend + 'static, durable: impl CacheBackend + 'static, prefer_durable: bool) -> DynamicCache {
///     if prefer_durable { durable.into_dynamic() } else { fast.into_dynamic() }
/// }
/// ```
pub trait DynamicCacheExt: Sized {
    /// Converts this backend into a `DynamicCache`.
    fn into_dynamic(self) -> DynamicCache;
}

impl<T> DynamicCacheExt for T
where
    T: CacheBackend + 'static,
{
    fn into_dynamic(self) -> DynamicCache {
        DynamicCache::new(self)
    }
}

/// A type-erased cache backend.
///
/// The concrete backend can be chosen at runtime, for example from configuration, while call
/// sites keep a single type. Clones share the same backend.
#[derive(Clone)]
pub struct DynamicCache(Arc<DynCacheBackend<'static>>);

impl DynamicCache {
    pub(crate) fn new<T>(backend: T) -> Self
    where
        T: CacheBackend + 'static,
    {
        Self(DynCacheBackend::new_arc(backend))
    }
}

impl fmt::Debug for DynamicCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCache").finish_non_exhaustive()
    }
}

impl CacheBackend for DynamicCache {
    async fn register(&self, collection: Collection) -> Result<(), Error> {
        self.0.register(collection).await
    }

    async fn set(&self, key: &CollectionKey, value: Value) -> Result<(), Error> {
        self.0.set(key, value).await
    }

    async fn get(&self, key: &CollectionKey) -> Result<Option<Value>, Error> {
        self.0.get(key).await
    }

    async fn del(&self, key: &CollectionKey) -> Result<(), Error> {
        self.0.del(key).await
    }

    async fn close(&self) -> Result<(), Error> {
        self.0.close().await
    }
}
