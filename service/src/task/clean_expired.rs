//! [`CleanExpired`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use derive_more::{Display, Error as StdError, From};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::user::{password_reset, session, PasswordReset, Session},
    infra::{cache, database, Cache, Database},
    Service,
};

use super::Task;

/// Configuration for [`CleanExpired`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between cleanings, must not be zero.
    #[default(time::Duration::from_secs(60 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] for purging expired [`Session`]s and [`PasswordReset`]s.
#[derive(Clone, Copy, Debug)]
pub struct CleanExpired<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Kv, Mail> Task<Start<By<CleanExpired<Self>, Config>>>
    for Service<Db, Kv, Mail>
where
    CleanExpired<Self>: Task<Perform<()>, Ok = (), Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CleanExpired<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CleanExpired {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::CleanExpired` failed: {e}");
            });
        }
    }
}

impl<Db, Kv, Mail> Task<Perform<()>> for CleanExpired<Service<Db, Kv, Mail>>
where
    Db: Database<
        Delete<By<Session, session::ExpirationDateTime>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
    Kv: Cache<
        Delete<By<PasswordReset, password_reset::ExpirationDateTime>>,
        Ok = (),
        Err = Traced<cache::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        // Both storages are purged even if one of them fails.
        let sessions = self
            .service
            .database()
            .execute(Delete(By::new(session::ExpirationDateTime::now())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E));
        let resets = self
            .service
            .cache()
            .execute(Delete(By::new(
                password_reset::ExpirationDateTime::now(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E));

        sessions.and(resets)
    }
}

/// Error of [`CleanExpired`] execution.
#[derive(Debug, Display, From, StdError)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Cache`] error.
    #[display("`Cache` operation failed: {_0}")]
    Cache(cache::Error),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::operations::{By, Insert, Perform, Select};

    use crate::{
        domain::user::{password_reset, session, PasswordReset, Session},
        infra::Cache as _,
        testing,
        Task as _,
    };

    use super::{CleanExpired, Config};

    #[tokio::test]
    async fn purges_only_expired_entries() {
        let svc = testing::service();
        let hour = Duration::from_secs(60 * 60);
        let user = testing::register(&svc, "alice", "alice@example.com").await;

        let stale = Session {
            token: session::Token::generate(),
            user_id: user.id,
            created_at: session::CreationDateTime::now() - hour,
            expires_at: session::ExpirationDateTime::now() - hour,
        };
        let fresh = Session {
            token: session::Token::generate(),
            user_id: user.id,
            created_at: session::CreationDateTime::now(),
            expires_at: session::ExpirationDateTime::now() + hour,
        };
        svc.database().put_session(stale.clone()).await;
        svc.database().put_session(fresh.clone()).await;
        let reset = |expires_at| PasswordReset {
            token: password_reset::Token::generate(),
            user_id: user.id,
            expires_at,
        };
        let valid = reset(password_reset::ExpirationDateTime::now() + hour);
        svc.cache().execute(Insert(valid.clone())).await.unwrap();
        svc.cache()
            .execute(Insert(reset(
                password_reset::ExpirationDateTime::now() - hour,
            )))
            .await
            .unwrap();
        assert_eq!(svc.cache().len().await, 2);

        CleanExpired {
            config: Config::default(),
            service: svc.clone(),
        }
        .execute(Perform(()))
        .await
        .unwrap();

        let tokens = svc.database().session_tokens().await;
        assert!(!tokens.contains(&stale.token));
        assert!(tokens.contains(&fresh.token));

        assert_eq!(svc.cache().len().await, 1);
        let left = svc
            .cache()
            .execute(Select(By::<Option<PasswordReset>, _>::new(&valid.token)))
            .await
            .unwrap();
        assert_eq!(left.map(|r| r.token), Some(valid.token));
    }
}
