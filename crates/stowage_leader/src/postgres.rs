// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PostgreSQL sessions drawn from a `deadpool-postgres` pool.

use deadpool_postgres::{Object, Pool};

use crate::{BoxError, LockSession, SessionSource};

const TRY_LOCK: &str = "SELECT pg_try_advisory_lock($1)";

const UNLOCK: &str = "SELECT pg_advisory_unlock($1)";

// A bigint advisory key is split across classid (high half) and objid (low half).
const HOLDS_LOCK: &str = "
    SELECT COUNT(*)
    FROM pg_locks
    WHERE locktype = 'advisory'
      AND classid::bigint = (($1::bigint >> 32) & 4294967295)
      AND objid::bigint = ($1::bigint & 4294967295)
      AND objsubid = 1
      AND granted
      AND pid = pg_backend_pid()";

/// Hands out pooled PostgreSQL connections as lock sessions.
///
/// A session keeps its connection out of the pool until the elector releases it.
#[derive(Debug, Clone)]
pub struct PgSessionSource {
    pool: Pool,
}

impl PgSessionSource {
    /// Creates a session source over `pool`.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl SessionSource for PgSessionSource {
    type Session = PgSession;

    async fn acquire(&self) -> Result<PgSession, BoxError> {
        let client = self.pool.get().await?;
        Ok(PgSession { client })
    }
}

/// One pinned PostgreSQL connection.
#[derive(Debug)]
pub struct PgSession {
    client: Object,
}

impl LockSession for PgSession {
    async fn try_lock(&mut self, key: i64) -> Result<bool, BoxError> {
        let row = self.client.query_one(TRY_LOCK, &[&key]).await?;
        Ok(row.try_get(0)?)
    }

    async fn holds_lock(&mut self, key: i64) -> Result<bool, BoxError> {
        let row = self.client.query_one(HOLDS_LOCK, &[&key]).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count > 0)
    }

    async fn unlock(&mut self, key: i64) -> Result<bool, BoxError> {
        let row = self.client.query_one(UNLOCK, &[&key]).await?;
        Ok(row.try_get(0)?)
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    fn discard(self) {
        // detaching from the pool closes the connection once the client is dropped
        drop(Object::take(self.client));
    }
}
