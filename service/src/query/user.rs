//! [`Query`]s of a single [`User`].

use common::operations::By;

use crate::domain::{user, User};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Looks up a [`User`] by its [`user::Id`], resolving into [`None`] if it's
/// deleted.
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

#[cfg(test)]
mod tests {
    use crate::{domain::user, testing, Query as _};

    use super::ById;

    #[tokio::test]
    async fn finds_registered_user() {
        let svc = testing::service();
        let alice = testing::register(&svc, "alice", "alice@example.com").await;

        let found = svc.execute(ById::by(alice.id)).await.unwrap().unwrap();

        assert_eq!(found.id, alice.id);
        assert_eq!(found.username.to_string(), "alice");
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let svc = testing::service();

        assert!(svc.execute(ById::by(user::Id::new())).await.unwrap().is_none());
    }
}
