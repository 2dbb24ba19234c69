//! Raw pooled connections and the [`Connection`] interface over them.

use std::{fmt, future::Future};

use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as Pooled, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// Interface for running SQL statements against Postgres.
///
/// Implemented by both transactional and non-transactional clients, so every
/// [`Database`] operation works inside a transaction as well as outside it.
///
/// [`Database`]: crate::infra::Database
pub trait Connection {
    /// Runs the `stmt`, returning all the resulting rows.
    ///
    /// # Errors
    ///
    /// If the `stmt` fails or no connection can be acquired.
    fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the `stmt`, returning at most one resulting row.
    ///
    /// # Errors
    ///
    /// If the `stmt` fails, returns more than one row, or no connection can be
    /// acquired.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the `stmt`, returning the number of rows it modified.
    ///
    /// # Errors
    ///
    /// If the `stmt` fails or no connection can be acquired.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the `sql` consisting of several statements without parameters.
    ///
    /// # Errors
    ///
    /// If any of the statements fails or no connection can be acquired.
    fn batch_exec(
        &self,
        sql: &str,
    ) -> impl Future<Output = Result<(), Traced<database::Error>>>;
}

/// [`Pooled`] connection with a transaction open in it.
#[self_referencing]
pub struct Transaction {
    /// Connection the transaction runs in.
    conn: Pooled,

    /// Open transaction, taken out once committed.
    #[borrows(mut conn)]
    #[not_covariant]
    open: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "`Option::is_none` doesn't fit the higher-ranked lifetime"
        )]
        let committed = self.with_open(|tx| tx.is_none());
        f.debug_struct("Transaction")
            .field("committed", &committed)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Opens a new [`Transaction`] in the provided [`Pooled`] connection.
    ///
    /// # Errors
    ///
    /// If Postgres refuses to start a transaction.
    pub async fn begin(conn: Pooled) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(conn, |c| {
            c.transaction().map_ok(Some).boxed()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
    }

    /// Returns the open transaction to run statements in.
    pub(super) fn tx(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_open(|tx| tx.as_ref().expect("taken on commit only"))
    }

    /// Commits this [`Transaction`], releasing its connection into the
    /// [`Pool`].
    ///
    /// # Errors
    ///
    /// If Postgres fails to commit.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "`Option::take` doesn't fit the higher-ranked lifetime"
        )]
        self.with_open_mut(|tx| tx.take())
            .expect("committed once only")
            .commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
