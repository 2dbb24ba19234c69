//! [`Command`] for resetting a [`user::Password`] by a [`PasswordReset`].

use common::{
    operations::{
        By, Commit, Delete, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Password;
use crate::{
    domain::{
        user::{self, password_reset, PasswordReset},
        User,
    },
    infra::{cache, database, Cache, Database},
    Service,
};

use super::Command;

/// [`Command`] for setting a new [`Password`] of a [`User`] by redeeming a
/// [`PasswordReset`].
///
/// Every [`PasswordReset`] is redeemable once only.
#[derive(Debug)]
pub struct ResetUserPassword {
    /// [`password_reset::Token`] provided by a client, not validated yet.
    pub token: String,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,
}

impl<Db, Kv, Mail> Command<ResetUserPassword> for Service<Db, Kv, Mail>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    Kv: for<'t> Cache<
            Select<By<Option<PasswordReset>, &'t password_reset::Token>>,
            Ok = Option<PasswordReset>,
            Err = Traced<cache::Error>,
        > + for<'t> Cache<
            Delete<By<Option<PasswordReset>, &'t password_reset::Token>>,
            Ok = Option<PasswordReset>,
            Err = Traced<cache::Error>,
        >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ResetUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ResetUserPassword {
            token,
            new_password,
        } = cmd;

        new_password
            .expose_secret()
            .check()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let token = password_reset::Token::new(token)
            .ok_or(E::InvalidToken)
            .map_err(tracerr::wrap!())?;
        let reset = self
            .cache()
            .execute(Select(By::<Option<PasswordReset>, _>::new(&token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidToken)
            .map_err(tracerr::wrap!())?;

        let password_hash =
            user::PasswordHash::new(new_password.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(reset.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(reset.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(reset.user_id))
            .map_err(tracerr::wrap!())?;

        user.password_hash = password_hash;
        user.updated_at = DateTime::now().coerce();
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Only one of concurrent redemptions manages to take the token, and
        // only once the new password is written.
        drop(
            self.cache()
                .execute(Delete(By::<Option<PasswordReset>, _>::new(&token)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::InvalidToken)
                .map_err(tracerr::wrap!())?,
        );

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`ResetUserPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Cache`] error.
    #[display("`Cache` operation failed: {_0}")]
    Cache(cache::Error),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to hash the [`Password`].
    #[display("Failed to hash `Password`: {_0}")]
    Hash(argon2::password_hash::Error),

    /// New [`Password`] is invalid.
    #[display("Invalid `Password`: {_0}")]
    InvalidPassword(#[error(not(source))] user::PasswordViolation),

    /// [`password_reset::Token`] is unknown, expired or already redeemed.
    #[display("Invalid `PasswordReset` token")]
    InvalidToken,

    /// [`User`] of the [`PasswordReset`] doesn't exist anymore.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use secrecy::SecretBox;

    use crate::{
        command::{
            create_user_session, CreateUserSession, RequestPasswordReset,
        },
        testing, Command as _,
    };

    use super::{ExecutionError as E, ResetUserPassword};

    fn cmd(token: &str, password: &str) -> ResetUserPassword {
        ResetUserPassword {
            token: token.to_owned(),
            new_password: SecretBox::new(Box::new(password.into())),
        }
    }

    async fn request_token(svc: &testing::Service) -> String {
        svc.execute(RequestPasswordReset::from("alice@example.com".to_owned()))
            .await
            .unwrap();
        let sent = svc.mailer().sent().await;
        testing::reset_token(sent.last().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn token_is_redeemable_once() {
        let svc = testing::service();
        let user = testing::register(&svc, "alice", "alice@example.com").await;
        let token = request_token(&svc).await;

        let updated = svc.execute(cmd(&token, "new secret")).await.unwrap();
        assert_eq!(updated.id, user.id);
        assert!(updated.updated_at >= user.updated_at);

        let err = svc.execute(cmd(&token, "newer secret")).await.unwrap_err();
        assert!(matches!(err.as_ref(), E::InvalidToken));

        let login = |password: &str| CreateUserSession::ByCredentials {
            username_or_email: "alice".into(),
            password: SecretBox::new(Box::new(password.into())),
        };
        drop(svc.execute(login("new secret")).await.unwrap());
        let err = svc.execute(login(testing::PASSWORD)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            create_user_session::ExecutionError::WrongPassword,
        ));
    }

    #[tokio::test]
    async fn rejects_garbage_token_and_short_password() {
        let svc = testing::service();
        drop(testing::register(&svc, "alice", "alice@example.com").await);
        let token = request_token(&svc).await;

        let err = svc.execute(cmd("garbage", "new secret")).await.unwrap_err();
        assert!(matches!(err.as_ref(), E::InvalidToken));

        let err = svc.execute(cmd(&token, "no")).await.unwrap_err();
        assert!(matches!(err.as_ref(), E::InvalidPassword(_)));

        // Failed attempts don't consume the token.
        drop(svc.execute(cmd(&token, "new secret")).await.unwrap());
    }

    #[tokio::test]
    async fn failed_update_keeps_token() {
        let svc = testing::service();
        let user = testing::register(&svc, "alice", "alice@example.com").await;
        let token = request_token(&svc).await;

        svc.database().fail_next_user_update().await;
        let err = svc.execute(cmd(&token, "new secret")).await.unwrap_err();
        assert!(matches!(err.as_ref(), E::Db(_)));

        let updated = svc.execute(cmd(&token, "new secret")).await.unwrap();
        assert_eq!(updated.id, user.id);
    }
}
