//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`session::Token`].
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db, Kv, Mail> Command<AuthorizeUserSession> for Service<Db, Kv, Mail>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'t> Database<
            Select<By<Option<Session>, &'t session::Token>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = self
            .database()
            .execute(Select(By::new(&token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| !s.is_expired())
            .ok_or(E::SessionNotExists)
            .map_err(tracerr::wrap!())?;

        drop(
            self.database()
                .execute(Select(By::new(session.user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(session.user_id))
                .map_err(tracerr::wrap!())?,
        );

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Session`] doesn't exist or has expired.
    #[display("`Session` does not exist")]
    SessionNotExists,

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        domain::user::{session, Session},
        testing, Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError as E};

    #[tokio::test]
    async fn accepts_live_session() {
        let svc = testing::service();
        drop(testing::register(&svc, "alice", "alice@example.com").await);
        let out = testing::login(&svc, "alice").await;

        let session = svc
            .execute(AuthorizeUserSession::from(out.session.token.clone()))
            .await
            .unwrap();

        assert_eq!(session.user_id, out.user.id);
    }

    #[tokio::test]
    async fn rejects_unknown_and_expired_sessions() {
        let svc = testing::service();
        let user = testing::register(&svc, "alice", "alice@example.com").await;

        let err = svc
            .execute(AuthorizeUserSession::from(session::Token::generate()))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::SessionNotExists));

        let hour = Duration::from_secs(60 * 60);
        let expired = Session {
            token: session::Token::generate(),
            user_id: user.id,
            created_at: session::CreationDateTime::now() - hour,
            expires_at: session::ExpirationDateTime::now() - hour,
        };
        svc.database().put_session(expired.clone()).await;

        let err = svc
            .execute(AuthorizeUserSession::from(expired.token))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::SessionNotExists));
    }
}
