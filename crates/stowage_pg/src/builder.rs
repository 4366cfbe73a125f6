// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for the PostgreSQL cache backend.

use std::fmt;
use std::sync::Arc;

use anyspawn::Spawner;
use deadpool_postgres::Pool;
use stowage_tier::{Collection, Error};
use tick::Clock;

use crate::PgCache;
use crate::reaper::Authorizer;
use crate::sql::validate_identifier;

const DEFAULT_SCHEMA: &str = "public";

/// Builder for creating a [`PgCache`].
///
/// # Examples
///
/// ```no_run
/// use stowage_pg::PgCache;
/// use tick::Clock;
///
/// # fn example(pool: deadpool_postgres::Pool) -> Result<(), stowage_tier::Error> {
/// let cache = PgCache::builder(pool, Clock::new_tokio())
///     .schema("cache")
///     .approve_deletion(|collection| collection.name() != "audit")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct PgCacheBuilder {
    pub(crate) pool: Pool,
    pub(crate) clock: Clock,
    pub(crate) schema: String,
    pub(crate) approve_deletion: Option<Authorizer>,
    pub(crate) spawner: Option<Spawner>,
}

impl fmt::Debug for PgCacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgCacheBuilder")
            .field("schema", &self.schema)
            .field("approve_deletion", &self.approve_deletion.is_some())
            .field("spawner", &self.spawner)
            .finish_non_exhaustive()
    }
}

impl PgCacheBuilder {
    pub(crate) fn new(pool: Pool, clock: Clock) -> Self {
        Self {
            pool,
            clock,
            schema: DEFAULT_SCHEMA.to_owned(),
            approve_deletion: None,
            spawner: None,
        }
    }

    /// Sets the schema holding the collection tables. Defaults to `public`.
    ///
    /// The schema must already exist.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Sets a callback deciding whether expired rows of a collection may be deleted.
    ///
    /// The callback runs on the reaper task before every periodic sweep; when it returns
    /// `false` the sweep is skipped. Expired rows stay in the table but are never returned.
    /// Pair it with a leader election so that only one process sweeps.
    ///
    /// Without a callback every periodic sweep runs.
    #[must_use]
    pub fn approve_deletion(mut self, approve: impl Fn(&Collection) -> bool + Send + Sync + 'static) -> Self {
        self.approve_deletion = Some(Arc::new(approve));
        self
    }

    /// Sets the spawner used for writes and reapers. Defaults to Tokio.
    #[must_use]
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Builds the cache.
    ///
    /// No connection is made until the first collection is registered.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the schema name is not a valid SQL identifier.
    pub fn build(self) -> Result<PgCache, Error> {
        validate_identifier("schema", &self.schema)?;
        Ok(PgCache::from_builder(self))
    }
}
