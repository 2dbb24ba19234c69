//! [`Session`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds a [`Session`] out of a [`Row`] of the `sessions` table.
fn from_row(row: &Row) -> Session {
    Session {
        token: row.get("token"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

impl<C> Database<Insert<Session>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        let Session {
            token,
            user_id,
            created_at,
            expires_at,
        } = session;

        const SQL: &str = "\
            INSERT INTO sessions (token, user_id, created_at, expires_at) \
            VALUES (\
                $1::VARCHAR, $2::UUID, $3::TIMESTAMPTZ, $4::TIMESTAMPTZ\
            )";
        self.exec(SQL, &[&token, &user_id, &created_at, &expires_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<'t, C> Database<Select<By<Option<Session>, &'t session::Token>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, &'t session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        const SQL: &str = "\
            SELECT token, user_id, created_at, expires_at \
            FROM sessions \
            WHERE token = $1::VARCHAR \
              AND expires_at > NOW() \
            LIMIT 1";
        self.query_opt(SQL, &[token])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<'t, C> Database<Delete<By<Option<Session>, &'t session::Token>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Option<Session>, &'t session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE token = $1::VARCHAR \
            RETURNING token, user_id, created_at, expires_at";
        self.query_opt(SQL, &[token])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Delete<By<Session, session::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE expires_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
