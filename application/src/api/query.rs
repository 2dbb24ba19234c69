//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, AsError, Context, Error, FieldError};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently logged in `User`.
    ///
    /// `errors` contain a `user` field if nobody is logged in, or an `id`
    /// field if the logged in `User` has just been deleted.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "profile",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn profile(ctx: &Context) -> Result<api::UserResponse, Error> {
        let not_logged_in = || {
            api::UserResponse::failed(FieldError::new(
                "user",
                "User is not logged in",
            ))
        };

        let Some(session) = ctx.try_current_session().await? else {
            return Ok(not_logged_in());
        };
        Ok(ctx
            .service()
            .execute(query::user::ById::by(session.user_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .map_or_else(
                || {
                    api::UserResponse::failed(FieldError::new(
                        "id",
                        "Invalid id",
                    ))
                },
                api::UserResponse::ok,
            ))
    }

    /// Returns the `Post` with the specified ID, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "post",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn post(
        id: api::post::Id,
        ctx: &Context,
    ) -> Result<Option<api::Post>, Error> {
        ctx.service()
            .execute(query::post::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|p| p.map(Into::into))
    }

    /// Fetches the page of `Post`s, newest first.
    ///
    /// `title` fuzzy matches `Post` titles by its words.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - both forward (`first`/`after`) and
    ///   backward (`last`/`before`) arguments are specified, or a count is
    ///   negative.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "posts",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            title = ?title,
        ),
    )]
    pub async fn posts(
        first: Option<i32>,
        after: Option<api::post::list::Cursor>,
        last: Option<i32>,
        before: Option<api::post::list::Cursor>,
        title: Option<String>,
        ctx: &Context,
    ) -> Result<api::post::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;
        const MAX_PAGE_SIZE: i32 = 50;

        let arguments = read::post::list::Arguments::new(
            first.map(|n| n.min(MAX_PAGE_SIZE)),
            after.map(Into::into),
            last.map(|n| n.min(MAX_PAGE_SIZE)),
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;
        let filter = read::post::list::Filter {
            title: title.filter(|t| !t.trim().is_empty()),
        };

        ctx.service()
            .execute(query::posts::List::by(read::post::list::Selector {
                arguments,
                filter: filter.clone(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|page| api::post::list::Connection::new(page, filter))
    }
}
