//! [`Post`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLScalar};
use service::{
    command::{create_post, delete_post, update_post},
    domain::{self, post},
    query, Query as _,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    define_error, AsError, Context, Error,
};

/// A [`Post`] of the blog.
#[derive(Clone, Debug)]
pub struct Post {
    /// ID of this [`Post`].
    pub id: Id,

    /// [`domain::Post`] representing this [`Post`], loaded lazily.
    post: OnceCell<domain::Post>,
}

impl From<domain::Post> for Post {
    fn from(post: domain::Post) -> Self {
        Self {
            id: post.id.into(),
            post: OnceCell::new_with(Some(post)),
        }
    }
}

impl Post {
    /// Creates a new [`Post`] with the provided ID, loaded on the first
    /// access.
    ///
    /// Accessing this [`Post`] errors with `POST_NOT_EXISTS` code if there is
    /// no such [`Post`].
    #[must_use]
    pub fn by_id(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            post: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Post`] representing this [`Post`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Post`] doesn't exist.
    async fn post(&self, ctx: &Context) -> Result<&domain::Post, Error> {
        let id = self.id.into();
        self.post
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::post::ById::by(id))
                    .map_err(AsError::into_error)
                    .and_then(|p| {
                        future::ready(
                            p.ok_or_else(|| PostError::NotExists.into()),
                        )
                    })
                    .map_err(ctx.error())
            })
            .await
    }
}

/// A `Post` of the blog.
#[graphql_object(context = Context)]
impl Post {
    /// Unique identifier of this `Post`.
    ///
    /// Newer `Post`s have greater identifiers.
    #[must_use]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Title of this `Post`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.post(ctx).await?.title.clone().into())
    }

    /// `User` who wrote this `Post`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.author",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn author(&self, ctx: &Context) -> Result<api::User, Error> {
        Ok(api::User::by_id(self.post(ctx).await?.author_id))
    }

    /// `DateTime` when this `Post` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.post(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Post` was updated last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Post.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.post(ctx).await?.updated_at.coerce())
    }
}

/// Unique identifier of a `Post`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(post::Id)]
#[into(post::Id)]
#[graphql(name = "PostId", transparent)]
pub struct Id(Uuid);

/// Title of a `Post`.
///
/// Between 1 and 255 characters, without surrounding whitespace.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "PostTitle", with = scalar::Via::<post::Title>)]
pub struct Title(post::Title);

impl AsError for create_post::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for update_post::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotAuthor(_) => Some(PostError::NotAuthor.into()),
            Self::PostNotExists(_) => Some(PostError::NotExists.into()),
        }
    }
}

impl AsError for delete_post::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotAuthor(_) => Some(PostError::NotAuthor.into()),
            Self::PostNotExists(_) => Some(PostError::NotExists.into()),
        }
    }
}

define_error! {
    enum PostError {
        #[code = "POST_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Post` doesn't exist"]
        NotExists,

        #[code = "NOT_POST_AUTHOR"]
        #[status = FORBIDDEN]
        #[message = "Only the author may change the `Post`"]
        NotAuthor,
    }
}

pub mod list {
    //! Definitions related to the [`Post`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use super::{Id, Post};
    use crate::{api::scalar, AsError, Context, Error};

    /// Cursor for the `Post` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::post::list::Cursor)]
    #[graphql(
        name = "PostListCursor",
        with = scalar::Via::<read::post::list::Cursor>,
    )]
    pub struct Cursor(read::post::list::Cursor);

    /// Edge in the [`Post`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::post::list::Edge);

    /// Edge in the `Post` list.
    #[graphql_object(name = "PostListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `PostListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `PostListEdge`.
        #[must_use]
        pub fn node(&self) -> Post {
            Post::by_id(self.0.node)
        }
    }

    /// Connection of the [`Post`] list.
    #[derive(Clone, Debug)]
    pub struct Connection {
        /// Underlying [`read::post::list::Connection`].
        page: read::post::list::Connection,

        /// [`read::post::list::Filter`] the page was selected with.
        filter: read::post::list::Filter,
    }

    impl Connection {
        /// Creates a new [`Connection`] out of the selected `page`.
        #[must_use]
        pub fn new(
            page: read::post::list::Connection,
            filter: read::post::list::Filter,
        ) -> Self {
            Self { page, filter }
        }
    }

    /// Connection of the `Post` list.
    #[graphql_object(name = "PostListConnection", context = Context)]
    impl Connection {
        /// Edges of this `PostListConnection`, newest `Post`s first.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.page.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            let info = self.page.page_info();
            PageInfo {
                has_next_page: info.has_next_page,
                has_previous_page: info.has_previous_page,
                start_cursor: info.start_cursor.map(Into::into),
                end_cursor: info.end_cursor.map(Into::into),
                filter: self.filter.clone(),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Debug)]
    pub struct PageInfo {
        /// Indicator whether there is a next page.
        has_next_page: bool,

        /// Indicator whether there is a previous page.
        has_previous_page: bool,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,

        /// [`read::post::list::Filter`] to count the [`Post`]s with.
        filter: read::post::list::Filter,
    }

    /// Information about a `PostListConnection` page.
    #[graphql_object(name = "PostListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> Option<Cursor> {
            self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> Option<Cursor> {
            self.end_cursor
        }

        /// Total count of the `Post`s matching the filter.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            let count: i64 = ctx
                .service()
                .execute(query::posts::TotalCount::by(self.filter.clone()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())?
                .into();
            count
                .try_into()
                .map_err(AsError::into_error)
                .map_err(ctx.error())
        }
    }
}
