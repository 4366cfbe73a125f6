// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage backends.
//!
//! [`CacheBackend`] defines the interface every backend implements. Application code
//! registers its collections once at startup and then reads and writes through the same
//! five operations, whichever storage sits underneath.

use crate::{Collection, CollectionKey, Error, Value};

/// Trait for cache backend implementations.
///
/// Every operation other than [`register`](Self::register) and [`close`](Self::close)
/// addresses a collection that must have been registered first; using an unregistered
/// collection is a usage error.
///
/// A miss is `Ok(None)` from [`get`](Self::get). Backend failures are reported as errors
/// and never conflated with a miss.
#[cfg_attr(
    any(test, feature = "dynamic-cache"),
    dynosaur::dynosaur(pub(crate) DynCacheBackend = dyn(box) CacheBackend, bridge(none))
)]
pub trait CacheBackend: Send + Sync {
    /// Registers a collection and provisions whatever storage it needs.
    ///
    /// Registering the same name twice is a usage error.
    fn register(&self, collection: Collection) -> impl Future<Output = Result<(), Error>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &CollectionKey, value: Value) -> impl Future<Output = Result<(), Error>> + Send;

    /// Reads the live value stored under `key`.
    fn get(&self, key: &CollectionKey) -> impl Future<Output = Result<Option<Value>, Error>> + Send;

    /// Removes the value stored under `key`. Removing an absent key succeeds.
    fn del(&self, key: &CollectionKey) -> impl Future<Output = Result<(), Error>> + Send;

    /// Releases backend resources and forgets all registrations. Closing twice succeeds.
    fn close(&self) -> impl Future<Output = Result<(), Error>> + Send;
}
