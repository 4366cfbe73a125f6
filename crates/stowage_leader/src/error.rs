// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Errors reported by the leader elector.

use std::fmt;

use recoverable::{Recovery, RecoveryInfo};

/// A boxed error returned by [`LockSession`](crate::LockSession) and
/// [`SessionSource`](crate::SessionSource) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The step of the election protocol that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LeaderOperation {
    /// Obtaining a database session from the pool.
    AcquireSession,
    /// Trying to take the advisory lock.
    TryLock,
    /// Confirming that this session still owns the advisory lock.
    VerifyLock,
    /// Releasing the advisory lock on shutdown.
    Unlock,
}

impl fmt::Display for LeaderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcquireSession => f.write_str("acquire a database session"),
            Self::TryLock => f.write_str("acquire the advisory lock"),
            Self::VerifyLock => f.write_str("verify advisory lock ownership"),
            Self::Unlock => f.write_str("release the advisory lock"),
        }
    }
}

/// An error raised while competing for or holding leadership.
///
/// These errors are never returned from cache operations. The elector delivers them on its
/// error channel and, for verification failures, gives up leadership.
#[ohno::error]
#[display("leader election failed to {operation}")]
pub struct LeaderError {
    operation: LeaderOperation,
}

impl LeaderError {
    pub(crate) fn during(operation: LeaderOperation, cause: BoxError) -> Self {
        Self::caused_by(operation, cause)
    }

    /// The step of the protocol that failed.
    #[must_use]
    pub const fn operation(&self) -> LeaderOperation {
        self.operation
    }
}

impl Recovery for LeaderError {
    fn recovery(&self) -> RecoveryInfo {
        RecoveryInfo::retry()
    }
}
