//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod fuzz_pattern;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use deadpool_postgres::Config;
pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
    fuzz_pattern::FuzzPattern,
};

/// Postgres [`Database`], either outside a transaction ([`NonTx`]) or inside
/// one ([`Tx`]).
///
/// Also serves as the password reset token [`Cache`] and as the migrations
/// target.
///
/// [`Cache`]: crate::infra::Cache
#[derive(Clone, Debug, Deref)]
pub struct Postgres<C = NonTx>(C);

impl Postgres {
    /// Creates a new [`Postgres`] over a connection pool built from the
    /// provided [`Config`].
    ///
    /// No connection is made until the first statement runs.
    ///
    /// # Errors
    ///
    /// If the [`Config`] is invalid.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::from_pool(pool)))
    }
}

/// Error of the [`Postgres`] database.
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement failed.
    #[display("Postgres statement failed: {_0}")]
    Query(connection::Error),

    /// Connection pool couldn't be built.
    #[display("Failed to build Postgres pool: {_0}")]
    PoolCreation(connection::PoolCreationError),

    /// Connection pool couldn't provide a connection.
    #[display("Postgres pool failed: {_0}")]
    Pool(connection::PoolError),
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the provided unique
    /// `constraint` (or of any one, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        let Self::Query(e) = self else {
            return false;
        };
        let Some(db) = e.as_db_error() else {
            return false;
        };
        *db.code() == SqlState::UNIQUE_VIOLATION
            && constraint.map_or(true, |c| db.constraint() == Some(c))
    }
}
