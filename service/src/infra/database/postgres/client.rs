//! Postgres clients connecting lazily on their first statement.

use std::{future::Future, sync::Arc};

use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Connection established on the first use and shared by all the clones of
/// a client.
#[derive(Debug)]
struct Lazy<C>(Arc<RwLock<Option<C>>>);

impl<C> Clone for Lazy<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C> Default for Lazy<C> {
    fn default() -> Self {
        Self(Arc::new(RwLock::new(None)))
    }
}

impl<C> Lazy<C> {
    /// Returns the established connection, running the `connect` future if
    /// there is none yet.
    async fn get_or_connect<F>(
        &self,
        connect: F,
    ) -> Result<RwLockReadGuard<'_, C>, Traced<database::Error>>
    where
        F: Future<Output = Result<C, Traced<database::Error>>>,
    {
        let read = self.0.read().await;
        let guard = if read.is_some() {
            read
        } else {
            drop(read);

            let mut write = self.0.write().await;
            // Another clone may have connected while the lock was released.
            if write.is_none() {
                *write = Some(connect.await.map_err(tracerr::wrap!())?);
            }
            write.downgrade()
        };

        Ok(RwLockReadGuard::map(guard, |c| {
            c.as_ref().expect("not taken while guarded")
        }))
    }

    /// Takes the established connection out, so the next use connects anew.
    async fn take(&self) -> Option<C> {
        self.0.write().await.take()
    }
}

/// Checks out a new [`connection::Pooled`] from the `pool`.
async fn checkout(
    pool: &connection::Pool,
) -> Result<connection::Pooled, Traced<database::Error>> {
    pool.get()
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Implements [`Connection`] for a client, running statements on whatever
/// `$raw` expression resolves the client's `connection()` guard into.
macro_rules! impl_connection {
    ($client:ty, |$conn:ident| $raw:expr) => {
        impl Connection for $client {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $conn = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.query(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $conn = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.query_opt(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $conn = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.execute(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn batch_exec(
                &self,
                sql: &str,
            ) -> Result<(), Traced<database::Error>> {
                let $conn = self.connection().await.map_err(tracerr::wrap!())?;
                $raw.batch_execute(sql)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }
        }
    };
}

/// Postgres client running every statement in its own implicit transaction.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to check the connection out from.
    pool: connection::Pool,

    /// Connection checked out on the first statement.
    conn: Lazy<connection::Pooled>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client not connected yet.
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            conn: Lazy::default(),
        }
    }

    /// Checks out a dedicated [`connection::Pooled`], not shared with this
    /// [`NonTx`] client.
    ///
    /// # Errors
    ///
    /// If the [`connection::Pool`] fails to provide a connection.
    pub(crate) async fn checkout(
        &self,
    ) -> Result<connection::Pooled, Traced<database::Error>> {
        checkout(&self.pool).await
    }

    /// Starts a [`Tx`] client, which takes over the connection of this
    /// [`NonTx`] client (if any) once it runs its first statement.
    #[must_use]
    pub fn transaction(&self) -> Tx {
        Tx {
            pool: self.pool.clone(),
            origin: Arc::new(Mutex::new(Some(self.clone()))),
            tx: Lazy::default(),
        }
    }

    /// Returns the connection of this [`NonTx`] client, checking it out if
    /// there is none.
    async fn connection(
        &self,
    ) -> Result<
        RwLockReadGuard<'_, connection::Pooled>,
        Traced<database::Error>,
    > {
        self.conn.get_or_connect(checkout(&self.pool)).await
    }
}

impl_connection!(NonTx, |conn| conn);

/// Postgres client running all its statements in a single transaction.
///
/// The transaction is opened on the first statement and rolled back if the
/// client is dropped without [`Tx::commit()`]ting.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to check the connection out from, if the
    /// originating [`NonTx`] client has none.
    pool: connection::Pool,

    /// [`NonTx`] client this [`Tx`] was started from, until its connection
    /// is taken over.
    origin: Arc<Mutex<Option<NonTx>>>,

    /// Transaction opened on the first statement.
    tx: Lazy<connection::Transaction>,
}

impl Tx {
    /// Commits the transaction of this [`Tx`] client, if it has been opened.
    ///
    /// # Errors
    ///
    /// If Postgres fails to commit.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        match self.tx.take().await {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }

    /// Returns the open transaction of this [`Tx`] client, opening it if
    /// there is none.
    async fn connection(
        &self,
    ) -> Result<
        RwLockReadGuard<'_, connection::Transaction>,
        Traced<database::Error>,
    > {
        self.tx
            .get_or_connect(async {
                let origin = self.origin.lock().await.take();
                let reused = match origin {
                    Some(non_tx) => non_tx.conn.take().await,
                    None => None,
                };
                let conn = match reused {
                    Some(c) => c,
                    None => checkout(&self.pool).await?,
                };
                connection::Transaction::begin(conn)
                    .await
                    .map_err(tracerr::wrap!())
            })
            .await
    }
}

impl_connection!(Tx, |conn| conn.tx());
