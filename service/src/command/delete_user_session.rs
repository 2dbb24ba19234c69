//! [`Command`] for deleting a [`Session`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Session`], so its [`session::Token`] can't be
/// used anymore.
///
/// Deleting a non-existent [`Session`] is not an error.
#[derive(Clone, Debug, From)]
pub struct DeleteUserSession {
    /// Token of the [`Session`] to delete.
    pub token: session::Token,
}

impl<Db, Kv, Mail> Command<DeleteUserSession> for Service<Db, Kv, Mail>
where
    Db: for<'t> Database<
        Delete<By<Option<Session>, &'t session::Token>>,
        Ok = Option<Session>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        let DeleteUserSession { token } = cmd;

        self.database()
            .execute(Delete(By::new(&token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
            .map(drop)
    }
}

/// Error of [`DeleteUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod tests {
    use crate::{
        command::{authorize_user_session, AuthorizeUserSession},
        domain::user::session,
        testing, Command as _,
    };

    use super::DeleteUserSession;

    #[tokio::test]
    async fn deleted_session_is_not_authorized() {
        let svc = testing::service();
        drop(testing::register(&svc, "alice", "alice@example.com").await);
        let token = testing::login(&svc, "alice").await.session.token;

        svc.execute(DeleteUserSession::from(token.clone()))
            .await
            .unwrap();

        let err = svc
            .execute(AuthorizeUserSession::from(token))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            authorize_user_session::ExecutionError::SessionNotExists,
        ));
    }

    #[tokio::test]
    async fn deleting_unknown_session_succeeds() {
        let svc = testing::service();

        svc.execute(DeleteUserSession::from(session::Token::generate()))
            .await
            .unwrap();
    }
}
