// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A polymorphic caching layer for backend services.
//!
//! Data is cached in named [`Collection`]s, each registered once with a backend that fixes its
//! value type and TTL. Call sites hold a [`Cache`], which hides the backend behind a
//! type-erased handle, so switching between backends is a configuration change:
//!
//! - [`NoCache`] stores nothing and turns every read into a miss.
//! - [`MemoryCache`] keeps a bounded, frequency-aware store per collection in process
//!   (`memory` feature, on by default).
//! - [`PgCache`] keeps one table per collection in PostgreSQL, with reapers deleting expired
//!   rows (`postgres` feature). The [`leader`] module gates those reapers so only one process
//!   deletes.
//!
//! The cache is never a system of record. Entries can disappear at any time and callers must
//! be ready to recompute them, which is what [`Cache::get_or_set`] does.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use stowage::{Cache, CacheConfig, CacheKind, Collection, ValueType};
//! use tick::Clock;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), stowage::Error> {
//! use stowage::CacheBackend;
//!
//! let cache = Cache::from_config(&CacheConfig::new(CacheKind::None), Clock::new_tokio());
//! let prices = Collection::new("prices", ValueType::Real).with_ttl(Duration::from_secs(30));
//! cache.register(prices.clone()).await?;
//!
//! let price: f64 = cache
//!     .get_or_set(&prices.key("AAPL"), |_| async { Ok::<_, std::io::Error>(189.5) })
//!     .await?;
//! assert!((price - 189.5).abs() < f64::EPSILON);
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! The `test-util` feature exports [`MockBackend`], which records every operation and can be
//! told to fail, for exercising code paths that handle cache outages.

mod cache;
mod config;
mod none;

#[doc(inline)]
pub use cache::Cache;
#[doc(inline)]
pub use config::{CacheConfig, CacheKind};
#[doc(inline)]
pub use none::NoCache;
#[cfg(feature = "postgres")]
#[doc(inline)]
pub use stowage_leader as leader;
#[cfg(feature = "memory")]
#[doc(inline)]
pub use stowage_memory::{MemoryCache, MemoryCacheBuilder};
#[cfg(feature = "postgres")]
#[doc(inline)]
pub use stowage_pg::{PgCache, PgCacheBuilder};
#[doc(inline)]
pub use stowage_tier::{
    CacheBackend, CacheValue, Collection, CollectionKey, DynamicCache, DynamicCacheExt, Error, ErrorKind, FOREVER, Json, Result, Value,
    ValueType,
};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use stowage_tier::testing::{CacheOp, MockBackend};
