//! [`Command`] for creating a [`Session`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password, Username};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Debug, From)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ByCredentials {
        /// [`Username`] or [`Email`] of a [`User`], not validated yet.
        ///
        /// Treated as an [`Email`] if it contains `@`.
        username_or_email: String,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,
    },

    /// Create a new [`Session`] by [`User`] ID.
    ByUserId(user::Id),
}

impl CreateUserSession {
    /// Minimal number of characters in a login input.
    const MIN_INPUT_LEN: usize = 3;
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Created [`Session`].
    pub session: Session,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,
}

impl<Db, Kv, Mail> Command<CreateUserSession> for Service<Db, Kv, Mail>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Username>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Session>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let user = match cmd {
            Cmd::ByCredentials {
                username_or_email: input,
                password,
            } => {
                if input.chars().count() < Cmd::MIN_INPUT_LEN {
                    return Err(tracerr::new!(E::InvalidUsernameOrEmail));
                }
                if password.expose_secret().check()
                    == Err(user::PasswordViolation::TooShort)
                {
                    return Err(tracerr::new!(E::InvalidPassword));
                }

                let found = if input.contains('@') {
                    match user::Email::new(input) {
                        Some(email) => self
                            .database()
                            .execute(Select(By::new(&email)))
                            .await
                            .map_err(tracerr::map_from_and_wrap!(=> E))?,
                        None => None,
                    }
                } else {
                    match user::Username::new(input) {
                        Some(name) => self
                            .database()
                            .execute(Select(By::new(&name)))
                            .await
                            .map_err(tracerr::map_from_and_wrap!(=> E))?,
                        None => None,
                    }
                };
                let user = found
                    .ok_or(E::UnknownUsernameOrEmail)
                    .map_err(tracerr::wrap!())?;

                if !user.password_hash.verify(password.expose_secret()) {
                    return Err(tracerr::new!(E::WrongPassword));
                }

                user
            }
            Cmd::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };

        let now = DateTime::now();
        let session = Session {
            token: session::Token::generate(),
            user_id: user.id,
            created_at: now.coerce(),
            expires_at: (now + self.config().session_ttl).coerce(),
        };
        self.database()
            .execute(Insert(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Output { session, user })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Login input is too short to be a [`Username`] or an [`Email`].
    #[display("Invalid username or email")]
    InvalidUsernameOrEmail,

    /// Provided [`Password`] is too short.
    #[display("Invalid `Password`")]
    InvalidPassword,

    /// No [`User`] has the provided [`Username`] or [`Email`].
    #[display("Unknown username or email")]
    UnknownUsernameOrEmail,

    /// Provided [`Password`] doesn't match the [`User`]'s one.
    #[display("Wrong password")]
    WrongPassword,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use secrecy::SecretBox;

    use crate::{domain::user, testing, Command as _};

    use super::{CreateUserSession, ExecutionError as E};

    fn login(input: &str, password: &str) -> CreateUserSession {
        CreateUserSession::ByCredentials {
            username_or_email: input.into(),
            password: SecretBox::new(Box::new(password.into())),
        }
    }

    #[tokio::test]
    async fn logs_in_by_username_or_email() {
        let svc = testing::service();
        let user = testing::register(&svc, "alice", "alice@example.com").await;

        let by_name = svc
            .execute(login("alice", testing::PASSWORD))
            .await
            .unwrap();
        let by_email = svc
            .execute(login("alice@example.com", testing::PASSWORD))
            .await
            .unwrap();

        assert_eq!(by_name.user.id, user.id);
        assert_eq!(by_email.user.id, user.id);
        assert_ne!(by_name.session.token, by_email.session.token);
        assert!(!by_name.session.is_expired());

        let tokens = svc.database().session_tokens().await;
        assert!(tokens.contains(&by_name.session.token));
        assert!(tokens.contains(&by_email.session.token));
    }

    #[tokio::test]
    async fn wrong_password_creates_no_session() {
        let svc = testing::service();
        drop(testing::register(&svc, "alice", "alice@example.com").await);

        let err = svc.execute(login("alice", "not it")).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::WrongPassword));
        assert!(svc.database().session_tokens().await.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_or_short_input() {
        let svc = testing::service();
        drop(testing::register(&svc, "alice", "alice@example.com").await);

        let err = svc.execute(login("bob", testing::PASSWORD)).await;
        assert!(matches!(
            err.unwrap_err().as_ref(),
            E::UnknownUsernameOrEmail,
        ));

        let err = svc.execute(login("bob@example.com", testing::PASSWORD)).await;
        assert!(matches!(
            err.unwrap_err().as_ref(),
            E::UnknownUsernameOrEmail,
        ));

        let err = svc.execute(login("al", testing::PASSWORD)).await;
        assert!(matches!(
            err.unwrap_err().as_ref(),
            E::InvalidUsernameOrEmail,
        ));

        let err = svc.execute(login("alice", "ab")).await;
        assert!(matches!(err.unwrap_err().as_ref(), E::InvalidPassword));
    }

    #[tokio::test]
    async fn by_user_id_requires_existing_user() {
        let svc = testing::service();
        let missing = user::Id::new();

        let err = svc
            .execute(CreateUserSession::ByUserId(missing))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(id) if *id == missing));
    }
}
