// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-process cache backend backed by moka.
//!
//! This crate provides [`MemoryCache`], a [`CacheBackend`](stowage_tier::CacheBackend) that
//! keeps one bounded store per registered collection. Stores use moka's `TinyLFU` policy, so
//! a burst of one-off keys cannot push a frequently read working set out of the cache.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use stowage_memory::MemoryCache;
//! use stowage_tier::{CacheBackend, Collection, Value, ValueType};
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let cache = MemoryCache::builder(Clock::new_frozen()).name("lookups").build();
//! let counters = Collection::new("counters", ValueType::Int64).with_local_max_items(100);
//!
//! cache.register(counters.clone()).await?;
//! cache.set(&counters.key("hits"), Value::Int64(7)).await?;
//! assert_eq!(cache.get(&counters.key("hits")).await?, Some(Value::Int64(7)));
//! # Ok::<(), stowage_tier::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Features
//!
//! - **Size bounds**: each collection holds at most `local_max_items` entries (zero means unbounded)
//! - **TTL**: entries older than their collection's TTL read as misses
//! - **Thread-safe**: safe for concurrent access from multiple tasks

mod builder;
mod cache;

#[doc(inline)]
pub use builder::MemoryCacheBuilder;
#[doc(inline)]
pub use cache::MemoryCache;
