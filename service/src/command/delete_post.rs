//! [`Command`] for deleting a [`Post`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{post, user, Post},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Post`] by its author.
#[derive(Clone, Copy, Debug)]
pub struct DeletePost {
    /// ID of the [`Post`] to delete.
    pub id: post::Id,

    /// ID of the [`User`] performing the deletion.
    pub by: user::Id,
}

impl<Db, Kv, Mail> Command<DeletePost> for Service<Db, Kv, Mail>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Post>, post::Id>>,
            Ok = Option<Post>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Post, post::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Post, post::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeletePost) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeletePost { id, by } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Post, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let post = tx
            .execute(Select(By::<Option<Post>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PostNotExists(id))
            .map_err(tracerr::wrap!())?;
        if post.author_id != by {
            return Err(tracerr::new!(E::NotAuthor(by)));
        }

        tx.execute(Delete(By::<Post, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`DeletePost`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not the author of the [`Post`].
    #[display("`User(id: {_0})` is not the author")]
    #[from(ignore)]
    NotAuthor(#[error(not(source))] user::Id),

    /// [`Post`] doesn't exist.
    #[display("`Post(id: {_0})` does not exist")]
    #[from(ignore)]
    PostNotExists(#[error(not(source))] post::Id),
}

#[cfg(test)]
mod tests {
    use crate::{
        command::{update_post, CreatePost, UpdatePost},
        domain::{post, Post},
        query, testing, Command as _, Query as _,
    };

    use super::{DeletePost, ExecutionError as E};

    #[tokio::test]
    async fn only_author_changes_post() {
        let svc = testing::service();
        let alice = testing::register(&svc, "alice", "alice@example.com").await;
        let bob = testing::register(&svc, "bob", "bob@example.com").await;

        let post = svc
            .execute(CreatePost {
                title: post::Title::new("First").unwrap(),
                author_id: alice.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(UpdatePost {
                id: post.id,
                title: post::Title::new("Hijacked").unwrap(),
                by: bob.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            update_post::ExecutionError::NotAuthor(_),
        ));

        let err = svc
            .execute(DeletePost {
                id: post.id,
                by: bob.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::NotAuthor(_)));

        let updated = svc
            .execute(UpdatePost {
                id: post.id,
                title: post::Title::new("Second").unwrap(),
                by: alice.id,
            })
            .await
            .unwrap();
        assert_eq!(updated.title.to_string(), "Second");

        svc.execute(DeletePost {
            id: post.id,
            by: alice.id,
        })
        .await
        .unwrap();

        let found: Option<Post> = svc
            .execute(query::post::ById::by(post.id))
            .await
            .unwrap();
        assert!(found.is_none());

        let err = svc
            .execute(DeletePost {
                id: post.id,
                by: alice.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::PostNotExists(_)));
    }
}
