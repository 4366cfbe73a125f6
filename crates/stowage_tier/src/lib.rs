// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions shared by every stowage cache backend.
//!
//! This crate defines the [`CacheBackend`] trait that all backends implement, the
//! [`Collection`] and [`CollectionKey`] types that address cached data, the typed
//! [`Value`] model with its backend-agnostic byte encoding, and the [`Error`] type with its
//! [`ErrorKind`] taxonomy.
//!
//! # Overview
//!
//! A cache is split into named collections. Each collection is registered once with a
//! backend, fixing its value type, TTL and (for in-process storage) its size bound. After
//! registration, values are written with `set`, read with `get` and removed with `del`.
//!
//! ```
//! use std::time::Duration;
//!
//! use stowage_tier::{CacheBackend, Collection, Value, ValueType};
//!
//! async fn remember_visits(cache: &impl CacheBackend) -> stowage_tier::Result<()> {
//!     let visits = Collection::new("visits", ValueType::Int64).with_ttl(Duration::from_secs(60));
//!     cache.register(visits.clone()).await?;
//!
//!     cache.set(&visits.key("home"), Value::Int64(1)).await?;
//!     assert_eq!(cache.get(&visits.key("home")).await?, Some(Value::Int64(1)));
//!     Ok(())
//! }
//! ```
//!
//! # Implementing a Backend
//!
//! Backends keep their per-collection state in a [`Registry`], which enforces the
//! registration rules, and use [`ValueType::encode`] and [`ValueType::decode`] to move
//! between values and stored bytes.
//!
//! # Dynamic Dispatch
//!
//! Enable the `dynamic-cache` feature (on by default) for [`DynamicCache`], which wraps any
//! `CacheBackend` in a clonable, type-erased container so the backend can be selected at
//! runtime.

mod backend;
mod collection;
pub mod error;
mod registry;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod value;

#[cfg(any(test, feature = "dynamic-cache"))]
mod dynamic;

#[doc(inline)]
pub use backend::CacheBackend;
#[doc(inline)]
pub use collection::{Collection, CollectionKey, FOREVER};
#[cfg(any(test, feature = "dynamic-cache"))]
#[doc(inline)]
pub use dynamic::{DynamicCache, DynamicCacheExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use registry::Registry;
#[doc(inline)]
pub use value::{CacheValue, Json, Value, ValueType};
