// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Leader election over PostgreSQL session-scoped advisory locks.
//!
//! Several processes sharing one database run a [`LeaderElector`] for the same numeric lock
//! key. At most one of them holds the lock at any time and considers itself the leader; the
//! others keep trying and take over once the leader stops or loses its connection.
//!
//! The relational cache backend uses the elector's [`authorizer`](LeaderElector::authorizer) so
//! only the leader deletes expired rows.
//!
//! Sessions are abstracted behind [`SessionSource`] and [`LockSession`].
//! [`PgSessionSource`] implements them over a `deadpool-postgres` pool.

mod elector;
mod error;
mod postgres;
mod session;

#[doc(inline)]
pub use elector::{LeaderElector, LeaderElectorBuilder};
#[doc(inline)]
pub use error::{BoxError, LeaderError, LeaderOperation};
#[doc(inline)]
pub use postgres::{PgSession, PgSessionSource};
#[doc(inline)]
pub use session::{LockSession, SessionSource};
