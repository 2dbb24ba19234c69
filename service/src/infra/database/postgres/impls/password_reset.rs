//! [`PasswordReset`]-related [`Cache`] implementations.
//!
//! Entries live in the `UNLOGGED` `password_reset_tokens` table, so they
//! survive restarts but not crashes of the database.

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::user::{password_reset, PasswordReset},
    infra::{
        cache,
        database::{postgres::Connection, Postgres},
        Cache,
    },
};

impl<C> Cache<Insert<PasswordReset>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(reset): Insert<PasswordReset>,
    ) -> Result<Self::Ok, Self::Err> {
        let PasswordReset {
            token,
            user_id,
            expires_at,
        } = reset;

        const SQL: &str = "\
            INSERT INTO password_reset_tokens (token, user_id, expires_at) \
            VALUES ($1::VARCHAR, $2::UUID, $3::TIMESTAMPTZ)";
        self.exec(SQL, &[&token, &user_id, &expires_at])
            .await
            .map_err(tracerr::map_from_and_wrap!(=> cache::Error))
            .map(drop)
    }
}

impl<'t, C> Cache<Select<By<Option<PasswordReset>, &'t password_reset::Token>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<PasswordReset>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<PasswordReset>, &'t password_reset::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        const SQL: &str = "\
            SELECT user_id, expires_at \
            FROM password_reset_tokens \
            WHERE token = $1::VARCHAR \
              AND expires_at > NOW() \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[token])
            .await
            .map_err(tracerr::map_from_and_wrap!(=> cache::Error))?
            .map(|row| PasswordReset {
                token: token.clone(),
                user_id: row.get("user_id"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<'t, C> Cache<Delete<By<Option<PasswordReset>, &'t password_reset::Token>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<PasswordReset>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Option<PasswordReset>, &'t password_reset::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        // Single statement, so only one of concurrent takers gets the row.
        const SQL: &str = "\
            DELETE FROM password_reset_tokens \
            WHERE token = $1::VARCHAR \
              AND expires_at > NOW() \
            RETURNING user_id, expires_at";
        Ok(self
            .query_opt(SQL, &[token])
            .await
            .map_err(tracerr::map_from_and_wrap!(=> cache::Error))?
            .map(|row| PasswordReset {
                token: token.clone(),
                user_id: row.get("user_id"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<C> Cache<Delete<By<PasswordReset, password_reset::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<PasswordReset, password_reset::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM password_reset_tokens \
            WHERE expires_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::map_from_and_wrap!(=> cache::Error))
            .map(drop)
    }
}
