//! [`Command`] for updating a [`Post`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
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

/// [`Command`] for changing a [`post::Title`] by the author of the [`Post`].
#[derive(Clone, Debug)]
pub struct UpdatePost {
    /// ID of the [`Post`] to update.
    pub id: post::Id,

    /// New [`post::Title`] of the [`Post`].
    pub title: post::Title,

    /// ID of the [`User`] performing the update.
    pub by: user::Id,
}

impl<Db, Kv, Mail> Command<UpdatePost> for Service<Db, Kv, Mail>
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
        > + Database<Update<Post>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Post;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdatePost) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdatePost { id, title, by } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut post = tx
            .execute(Select(By::<Option<Post>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PostNotExists(id))
            .map_err(tracerr::wrap!())?;
        if post.author_id != by {
            return Err(tracerr::new!(E::NotAuthor(by)));
        }

        if post.title == title {
            return Ok(post);
        }

        post.title = title;
        post.updated_at = DateTime::now().coerce();
        tx.execute(Update(post.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(post)
    }
}

/// Error of [`UpdatePost`] [`Command`] execution.
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
