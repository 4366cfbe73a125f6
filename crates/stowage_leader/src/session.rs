// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Database sessions able to hold session-scoped advisory locks.

use crate::BoxError;

/// A database session that can take, confirm and release an advisory lock.
///
/// Advisory locks are owned by the session that took them and are released by the server when
/// the session ends, so a session must stay pinned to one elector for as long as it may hold
/// the lock.
pub trait LockSession: Send + 'static {
    /// Tries to take the lock without waiting. Returns `true` if the lock was taken.
    fn try_lock(&mut self, key: i64) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns `true` if this session currently holds the lock.
    fn holds_lock(&mut self, key: i64) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Releases the lock. Returns `false` if the session did not hold it.
    fn unlock(&mut self, key: i64) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns `true` once the underlying connection has been lost.
    fn is_closed(&self) -> bool;

    /// Ends the session instead of handing it back for reuse.
    ///
    /// Called when the session may still hold the lock; ending it makes the server release
    /// every lock it owns.
    fn discard(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// A source of [`LockSession`]s, typically a connection pool.
pub trait SessionSource: Send + Sync + 'static {
    /// The session type handed out by this source.
    type Session: LockSession;

    /// Obtains a session.
    fn acquire(&self) -> impl Future<Output = Result<Self::Session, BoxError>> + Send;
}
