// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! PostgreSQL cache backend for stowage.
//!
//! [`PgCache`] stores every registered collection in its own `UNLOGGED` table, so cached
//! data survives process restarts and is shared by every process using the same database.
//! Expired rows are invisible to reads right away and are physically deleted by a background
//! reaper per collection.
//!
//! In a deployment with many processes, gate the reapers with a leader election so only one
//! of them deletes rows:
//!
//! ```no_run
//! use stowage_leader::{LeaderElector, PgSessionSource};
//! use stowage_pg::PgCache;
//! use tick::Clock;
//!
//! # async fn example(pool: deadpool_postgres::Pool) -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Clock::new_tokio();
//! let (elector, _errors) = LeaderElector::builder(PgSessionSource::new(pool.clone()), 42, clock.clone())
//!     .start()
//!     .await?;
//!
//! let cache = PgCache::builder(pool, clock)
//!     .approve_deletion(elector.authorizer())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod cache;
mod reaper;
mod sql;

#[doc(inline)]
pub use builder::PgCacheBuilder;
#[doc(inline)]
pub use cache::PgCache;
