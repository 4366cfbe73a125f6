// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache backend storing each collection in its own PostgreSQL table.

use std::fmt;
use std::sync::Arc;

use anyspawn::Spawner;
use deadpool_postgres::Pool;
use deadpool_postgres::tokio_postgres::types::ToSql;
use parking_lot::Mutex;
use stowage_tier::{CacheBackend, Collection, CollectionKey, Error, Registry, Value};
use tick::Clock;

use crate::builder::PgCacheBuilder;
use crate::reaper::{self, Authorizer, ReaperHandle};
use crate::sql::{Statements, validate_identifier};

struct Partition {
    collection: Collection,
    statements: Statements,
    ttl_secs: f64,
    reaper: Mutex<Option<ReaperHandle>>,
}

struct Inner {
    pool: Pool,
    clock: Clock,
    schema: String,
    approve_deletion: Option<Authorizer>,
    spawner: Option<Spawner>,
    partitions: Registry<Partition>,
}

impl Inner {
    fn spawner(&self) -> Spawner {
        self.spawner.clone().unwrap_or_else(Spawner::new_tokio)
    }
}

/// A cache backend keeping every collection in an `UNLOGGED` PostgreSQL table.
///
/// Registering a collection creates its table in the configured schema if needed:
///
/// | column     | type          |                        |
/// |------------|---------------|------------------------|
/// | `id`       | `BIGSERIAL`   | primary key            |
/// | `key`      | `TEXT`        | unique                 |
/// | `value`    | `BYTEA`       | the encoded value      |
/// | `added_at` | `TIMESTAMPTZ` | indexed, reset by `set` |
///
/// A row is live while its age is within the collection's TTL; `set` resets the age. Expired
/// rows are never returned and are deleted by a reaper task that the cache runs for each
/// collection with a TTL. The reaper sweeps once when the collection is registered and then
/// once per TTL, asking the [`approve_deletion`](PgCacheBuilder::approve_deletion) callback
/// before every sweep, the first one included.
///
/// Writes run on a spawned task, so a write that has started completes even if the caller
/// stops waiting for it.
///
/// The pool is owned by the caller; [`close`](CacheBackend::close) stops the reapers but
/// leaves the pool open. Clones share the same underlying state.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use stowage_pg::PgCache;
/// use stowage_tier::{CacheBackend, Collection, Value, ValueType};
/// use tick::Clock;
///
/// # async fn example(pool: deadpool_postgres::Pool) -> Result<(), stowage_tier::Error> {
/// let cache = PgCache::builder(pool, Clock::new_tokio()).schema("cache").build()?;
/// let tokens = Collection::new("tokens", ValueType::String).with_ttl(Duration::from_secs(300));
///
/// cache.register(tokens.clone()).await?;
/// cache.set(&tokens.key("alice"), Value::from("t0k3n")).await?;
/// assert_eq!(cache.get(&tokens.key("alice")).await?, Some(Value::from("t0k3n")));
///
/// cache.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PgCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for PgCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgCache")
            .field("schema", &self.inner.schema)
            .field("collections", &self.inner.partitions.len())
            .finish_non_exhaustive()
    }
}

impl PgCache {
    /// Creates a new builder for a cache over `pool`.
    #[must_use]
    pub fn builder(pool: Pool, clock: Clock) -> PgCacheBuilder {
        PgCacheBuilder::new(pool, clock)
    }

    pub(crate) fn from_builder(builder: PgCacheBuilder) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool: builder.pool,
                clock: builder.clock,
                schema: builder.schema,
                approve_deletion: builder.approve_deletion,
                spawner: builder.spawner,
                partitions: Registry::new(),
            }),
        }
    }

    /// The schema holding the collection tables.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.inner.schema
    }

    fn start_reaper(&self, partition: &Partition) {
        let Some(period) = partition.collection.ttl() else {
            return;
        };

        let pool = self.inner.pool.clone();
        let sql: Arc<str> = Arc::from(partition.statements.delete_expired.as_str());
        let ttl_secs = partition.ttl_secs;
        let handle = reaper::spawn(
            &self.inner.spawner(),
            &self.inner.clock,
            partition.collection.clone(),
            period,
            self.inner.approve_deletion.clone(),
            move || {
                let pool = pool.clone();
                let sql = Arc::clone(&sql);
                async move { execute(&pool, &sql, &[&ttl_secs]).await }
            },
        );

        *partition.reaper.lock() = Some(handle);
    }
}

async fn execute(pool: &Pool, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, Error> {
    let client = pool.get().await.map_err(Error::backend)?;
    let statement = client.prepare_cached(sql).await.map_err(Error::backend)?;
    client.execute(&statement, params).await.map_err(Error::backend)
}

impl CacheBackend for PgCache {
    async fn register(&self, collection: Collection) -> Result<(), Error> {
        validate_identifier("collection", collection.name())?;
        self.inner.partitions.ensure_vacant(collection.name())?;

        let statements = Statements::new(&self.inner.schema, collection.name());
        let client = self.inner.pool.get().await.map_err(Error::backend)?;
        client.batch_execute(&statements.create_table).await.map_err(Error::backend)?;
        drop(client);

        tracing::info!(
            cache.schema = self.inner.schema.as_str(),
            cache.collection = %collection,
            "registered relational collection"
        );

        let name = collection.name().to_owned();
        let partition = self.inner.partitions.insert(
            &name,
            Partition {
                ttl_secs: collection.effective_ttl().as_secs_f64(),
                collection,
                statements,
                reaper: Mutex::new(None),
            },
        )?;
        self.start_reaper(&partition);
        Ok(())
    }

    async fn set(&self, key: &CollectionKey, value: Value) -> Result<(), Error> {
        let partition = self.inner.partitions.get(key.name())?;
        let bytes = partition.collection.value_type().encode(&value)?;
        let pool = self.inner.pool.clone();
        let key = key.key().to_owned();

        self.inner
            .spawner()
            .spawn(async move {
                let value: &[u8] = &bytes;
                execute(&pool, &partition.statements.upsert, &[&key, &value]).await
            })
            .await?;
        Ok(())
    }

    async fn get(&self, key: &CollectionKey) -> Result<Option<Value>, Error> {
        let partition = self.inner.partitions.get(key.name())?;
        let client = self.inner.pool.get().await.map_err(Error::backend)?;
        let statement = client
            .prepare_cached(&partition.statements.select_live)
            .await
            .map_err(Error::backend)?;
        let row = client
            .query_opt(&statement, &[&key.key(), &partition.ttl_secs])
            .await
            .map_err(Error::backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let bytes: &[u8] = row.try_get(0).map_err(Error::backend)?;
        partition.collection.value_type().decode(bytes).map(Some)
    }

    async fn del(&self, key: &CollectionKey) -> Result<(), Error> {
        let partition = self.inner.partitions.get(key.name())?;
        let pool = self.inner.pool.clone();
        let key = key.key().to_owned();

        self.inner
            .spawner()
            .spawn(async move { execute(&pool, &partition.statements.delete_by_key, &[&key]).await })
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        for partition in self.inner.partitions.close() {
            let reaper = partition.reaper.lock().take();
            if let Some(reaper) = reaper {
                reaper.shutdown().await;
            }
        }
        Ok(())
    }
}
