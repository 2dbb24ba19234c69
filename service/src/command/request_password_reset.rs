//! [`Command`] for requesting a [`PasswordReset`].

use common::operations::{By, Deliver, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, password_reset, PasswordReset},
        User,
    },
    infra::{
        cache, database,
        mailer::{self, Letter},
        Cache, Database, Mailer,
    },
    Service,
};

use super::Command;

/// [`Command`] for requesting a [`PasswordReset`] of the [`User`] owning the
/// provided [`user::Email`].
///
/// Succeeds the same way whether such a [`User`] exists or not, so the
/// registered [`user::Email`]s can't be enumerated. Failures to store the
/// [`PasswordReset`] or to send the [`Letter`] are logged only.
#[derive(Clone, Debug, From)]
pub struct RequestPasswordReset {
    /// [`user::Email`] of the [`User`], not validated yet.
    pub email: String,
}

impl<Db, Kv, Mail> Command<RequestPasswordReset> for Service<Db, Kv, Mail>
where
    Db: for<'e> Database<
        Select<By<Option<User>, &'e user::Email>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    Kv: Cache<Insert<PasswordReset>, Ok = (), Err = Traced<cache::Error>>,
    Mail: Mailer<Deliver<Letter>, Ok = (), Err = Traced<mailer::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestPasswordReset,
    ) -> Result<Self::Ok, Self::Err> {
        let RequestPasswordReset { email } = cmd;

        let Some(email) = user::Email::new(email) else {
            return Ok(());
        };
        let Some(user) = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?
        else {
            return Ok(());
        };

        let reset = PasswordReset {
            token: password_reset::Token::generate(),
            user_id: user.id,
            expires_at: password_reset::ExpirationDateTime::now()
                + self.config().password_reset.ttl,
        };
        let link =
            format!("{}{}", self.config().password_reset.link, reset.token);

        if let Err(e) = self.cache().execute(Insert(reset)).await {
            log::error!(
                user.id = %user.id,
                "failed to store `PasswordReset`: {e}",
            );
            return Ok(());
        }

        let letter = Letter {
            to: user.email,
            subject: "Change password".to_owned(),
            body: format!("<a href=\"{link}\">reset password</a>"),
        };
        if let Err(e) = self.mailer().execute(Deliver(letter)).await {
            log::error!(
                user.id = %user.id,
                "failed to send `PasswordReset` letter: {e}",
            );
        }

        Ok(())
    }
}

/// Error of [`RequestPasswordReset`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod tests {
    use crate::{testing, Command as _};

    use super::RequestPasswordReset;

    #[tokio::test]
    async fn mails_link_to_existing_user_only() {
        let svc = testing::service();
        drop(testing::register(&svc, "alice", "alice@example.com").await);

        for email in ["nobody@example.com", "not an email"] {
            svc.execute(RequestPasswordReset::from(email.to_owned()))
                .await
                .unwrap();
        }
        assert!(svc.mailer().sent().await.is_empty());

        let email = "alice@example.com".to_owned();
        svc.execute(RequestPasswordReset::from(email)).await.unwrap();

        let sent = svc.mailer().sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.to_string(), "alice@example.com");
        assert!(sent[0].body.contains(&svc.config().password_reset.link));
        assert!(testing::reset_token(&sent[0]).is_some());
    }
}
