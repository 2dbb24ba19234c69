//! [`Database`]-related implementations.

#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Names of the [`Database`] unique constraints the service reacts upon.
pub mod constraint {
    #[cfg(doc)]
    use crate::domain::user::{Email, Username};

    /// Uniqueness of a [`Username`].
    pub const USERS_USERNAME: &str = "users_username_key";

    /// Uniqueness of an [`Email`].
    pub const USERS_EMAIL: &str = "users_email_key";
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    /// Unique constraint is violated by a storage without a native
    /// representation of such errors.
    #[display("Unique constraint `{_0}` is violated")]
    #[from(ignore)]
    UniqueViolation(#[error(not(source))] String),
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the provided unique
    /// `constraint` (or of any one, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
            Self::UniqueViolation(c) => constraint.map_or(true, |n| n == c),
        }
    }
}
