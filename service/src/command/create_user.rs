//! [`Command`] for creating a new [`User`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password, Username};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
///
/// Uniqueness of the [`Username`] and the [`Email`] is guaranteed by the
/// [`Database`], so concurrent registrations can't produce duplicates.
#[derive(Debug)]
pub struct CreateUser {
    /// [`Username`] of a new [`User`], not validated yet.
    pub username: String,

    /// [`Email`] of a new [`User`], not validated yet.
    pub email: String,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,
}

impl<Db, Kv, Mail> Command<CreateUser> for Service<Db, Kv, Mail>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            username,
            email,
            password,
        } = cmd;

        let email = user::Email::new(email)
            .ok_or(E::InvalidEmail)
            .map_err(tracerr::wrap!())?;
        let username = username
            .parse::<user::Username>()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        password
            .expose_secret()
            .check()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let user = User {
            id: user::Id::new(),
            username,
            email,
            password_hash: user::PasswordHash::new(password.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(user.clone())).await.map_err(|e| {
            use database::constraint;

            let db = e.as_ref();
            if db.is_unique_violation(Some(constraint::USERS_USERNAME)) {
                tracerr::new!(E::UsernameOccupied(user.username.clone()))
            } else if db.is_unique_violation(Some(constraint::USERS_EMAIL)) {
                tracerr::new!(E::EmailOccupied(user.email.clone()))
            } else {
                (tracerr::map_from_and_wrap!(=> E))(e)
            }
        })?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to hash the [`Password`].
    #[display("Failed to hash `Password`: {_0}")]
    Hash(argon2::password_hash::Error),

    /// Provided [`Username`] is invalid.
    #[display("Invalid `Username`: {_0}")]
    InvalidUsername(#[error(not(source))] user::UsernameViolation),

    /// Provided [`Email`] is invalid.
    #[display("Invalid `Email`")]
    InvalidEmail,

    /// Provided [`Password`] is invalid.
    #[display("Invalid `Password`: {_0}")]
    InvalidPassword(#[error(not(source))] user::PasswordViolation),

    /// [`Username`] is occupied by another [`User`].
    #[display("`{_0}` username is occupied")]
    #[from(ignore)]
    UsernameOccupied(#[error(not(source))] user::Username),

    /// [`Email`] is occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod tests {
    use secrecy::SecretBox;

    use crate::{domain::user, testing, Command as _};

    use super::{CreateUser, ExecutionError as E};

    fn cmd(username: &str, email: &str, password: &str) -> CreateUser {
        CreateUser {
            username: username.into(),
            email: email.into(),
            password: SecretBox::new(Box::new(password.into())),
        }
    }

    #[tokio::test]
    async fn creates_user_with_hashed_password() {
        let svc = testing::service();

        let user = svc
            .execute(cmd("alice", "alice@example.com", "wonderland"))
            .await
            .unwrap();

        assert_eq!(user.username.to_string(), "alice");
        assert!(user.password_hash.verify(&"wonderland".into()));
        assert_ne!(user.password_hash.to_string(), "wonderland");
        assert_eq!(svc.database().users_count().await, 1);
    }

    #[tokio::test]
    async fn rejects_taken_username_and_email() {
        let svc = testing::service();
        drop(
            svc.execute(cmd("alice", "alice@example.com", "wonderland"))
                .await
                .unwrap(),
        );

        let err = svc
            .execute(cmd("alice", "other@example.com", "wonderland"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::UsernameOccupied(_)));

        let err = svc
            .execute(cmd("bob", "alice@example.com", "wonderland"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::EmailOccupied(_)));

        assert_eq!(svc.database().users_count().await, 1);
    }

    #[tokio::test]
    async fn validates_input() {
        let svc = testing::service();

        let err = svc
            .execute(cmd("al", "alice@example.com", "wonderland"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            E::InvalidUsername(user::UsernameViolation::TooShort),
        ));

        let err = svc
            .execute(cmd("al@ce", "alice@example.com", "wonderland"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            E::InvalidUsername(user::UsernameViolation::At),
        ));

        let err = svc
            .execute(cmd("alice", "alice.example.com", "wonderland"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::InvalidEmail));

        let err = svc
            .execute(cmd("alice", "alice@example.com", "no"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            E::InvalidPassword(user::PasswordViolation::TooShort),
        ));

        assert_eq!(svc.database().users_count().await, 0);
    }
}
