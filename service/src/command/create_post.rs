//! [`Command`] for creating a new [`Post`].

use common::{operations::Insert, DateTime};
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

/// [`Command`] for creating a new [`Post`].
#[derive(Clone, Debug)]
pub struct CreatePost {
    /// [`post::Title`] of a new [`Post`].
    pub title: post::Title,

    /// ID of the [`User`] writing the [`Post`].
    pub author_id: user::Id,
}

impl<Db, Kv, Mail> Command<CreatePost> for Service<Db, Kv, Mail>
where
    Db: Database<Insert<Post>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Post;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreatePost) -> Result<Self::Ok, Self::Err> {
        let CreatePost { title, author_id } = cmd;

        let now = DateTime::now();
        let post = Post {
            id: post::Id::new(),
            title,
            author_id,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        self.database()
            .execute(Insert(post.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?;

        Ok(post)
    }
}

/// Error of [`CreatePost`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
