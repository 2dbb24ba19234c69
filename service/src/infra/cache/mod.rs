//! [`Cache`]-related implementations.
//!
//! [`Cache`] keeps short-living entries which may expire before being used,
//! like [`PasswordReset`]s. Expired entries are invisible to reads, but still
//! occupy space until purged.
//!
//! [`PasswordReset`]: crate::domain::user::PasswordReset

mod memory;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
use crate::infra::database;

pub use self::memory::Memory;

/// Operation of a key-value storage with expiration.
pub use common::Handler as Cache;

/// [`Cache`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Cache`] is backed by a [`Database`] which failed.
    ///
    /// [`Database`]: crate::infra::Database
    #[cfg(feature = "postgres")]
    #[display("`Database` operation failed: {_0}")]
    Database(database::Error),
}
