//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use secrecy::SecretBox;
use service::{
    command::{self, delete_post, update_post},
    domain::user,
    Command as _,
};
use tracing as log;

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";

    /// Logs in the [`User`] with the provided ID.
    ///
    /// [`User`]: api::User
    async fn log_in(
        id: user::Id,
        ctx: &Context,
    ) -> Result<api::UserResponse, Error> {
        let output = match ctx
            .service()
            .execute(command::CreateUserSession::ByUserId(id))
            .await
        {
            Ok(o) => o,
            Err(e) => return api::UserResponse::reject(e).map_err(ctx.error()),
        };
        ctx.establish_session(output.session).await;
        Ok(api::UserResponse::ok(output.user))
    }
}

/// Wraps the provided raw `password` into a [`SecretBox`].
fn secret(password: String) -> SecretBox<user::Password> {
    SecretBox::init_with(move || password.into())
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new `User` and logs them in.
    ///
    /// Invalid or already taken `username`, `email` and `password` are
    /// reported in `errors`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %options.email,
            gql.name = "register",
            otel.name = Self::SPAN_NAME,
            username = %options.username,
        ),
    )]
    pub async fn register(
        options: api::user::UsernamePasswordInput,
        ctx: &Context,
    ) -> Result<api::UserResponse, Error> {
        let api::user::UsernamePasswordInput {
            username,
            email,
            password,
        } = options;

        let user = match ctx
            .service()
            .execute(command::CreateUser {
                username,
                email,
                password: secret(password),
            })
            .await
        {
            Ok(u) => u,
            Err(e) => return api::UserResponse::reject(e).map_err(ctx.error()),
        };
        Self::log_in(user.id, ctx).await
    }

    /// Logs in the `User` by their username or email.
    ///
    /// Unknown `usernameOrEmail` and wrong `password` are reported in
    /// `errors`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "login",
            otel.name = Self::SPAN_NAME,
            username_or_email = %username_or_email,
        ),
    )]
    pub async fn login(
        username_or_email: String,
        password: String,
        ctx: &Context,
    ) -> Result<api::UserResponse, Error> {
        let output = match ctx
            .service()
            .execute(command::CreateUserSession::ByCredentials {
                username_or_email,
                password: secret(password),
            })
            .await
        {
            Ok(o) => o,
            Err(e) => return api::UserResponse::reject(e).map_err(ctx.error()),
        };
        ctx.establish_session(output.session).await;
        Ok(api::UserResponse::ok(output.user))
    }

    /// Logs out the current `User`.
    ///
    /// Returns `false` if the session couldn't be destroyed, and `true`
    /// otherwise, including the case of nobody being logged in.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "logout",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn logout(ctx: &Context) -> bool {
        let session = match ctx.try_current_session().await {
            Ok(s) => s,
            Err(e) => {
                log::error!("failed to check the session: {e}");
                return false;
            }
        };
        if let Some(session) = session {
            let res = ctx
                .service()
                .execute(command::DeleteUserSession {
                    token: session.token,
                })
                .await;
            if let Err(e) = res {
                log::error!("failed to delete the session: {e}");
                return false;
            }
        }
        ctx.destroy_session().await;
        true
    }

    /// Sends a letter with a password reset link to the provided `email`.
    ///
    /// Returns `true` whether such a `User` exists or not.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "forgotPassword",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn forgot_password(
        email: String,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::RequestPasswordReset { email })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Sets a new password by the `token` sent to the `User`'s email, and
    /// logs them in.
    ///
    /// Every `token` works once only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "changePassword",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn change_password(
        token: String,
        new_password: String,
        ctx: &Context,
    ) -> Result<api::UserResponse, Error> {
        let user = match ctx
            .service()
            .execute(command::ResetUserPassword {
                token,
                new_password: secret(new_password),
            })
            .await
        {
            Ok(u) => u,
            Err(e) => return api::UserResponse::reject(e).map_err(ctx.error()),
        };
        Self::log_in(user.id, ctx).await
    }

    /// Creates a new `Post` written by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - nobody is logged in.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createPost",
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn create_post(
        title: api::post::Title,
        ctx: &Context,
    ) -> Result<api::Post, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreatePost {
                title: title.into(),
                author_id: my_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Changes the title of the `Post`.
    ///
    /// Returns `null` if there is no such `Post`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - nobody is logged in;
    /// - `NOT_POST_AUTHOR` - the `Post` is written by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updatePost",
            id = %id,
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn update_post(
        id: api::post::Id,
        title: api::post::Title,
        ctx: &Context,
    ) -> Result<Option<api::Post>, Error> {
        let my_id = ctx.current_session().await?.user_id;

        match ctx
            .service()
            .execute(command::UpdatePost {
                id: id.into(),
                title: title.into(),
                by: my_id,
            })
            .await
        {
            Ok(post) => Ok(Some(post.into())),
            Err(e) => {
                if let update_post::ExecutionError::PostNotExists(_) =
                    e.as_ref()
                {
                    return Ok(None);
                }
                Err(e.into_error()).map_err(ctx.error())
            }
        }
    }

    /// Deletes the `Post`.
    ///
    /// Returns `false` if there is no such `Post`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - nobody is logged in;
    /// - `NOT_POST_AUTHOR` - the `Post` is written by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deletePost",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_post(
        id: api::post::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        let my_id = ctx.current_session().await?.user_id;

        match ctx
            .service()
            .execute(command::DeletePost {
                id: id.into(),
                by: my_id,
            })
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                if let delete_post::ExecutionError::PostNotExists(_) =
                    e.as_ref()
                {
                    return Ok(false);
                }
                Err(e.into_error()).map_err(ctx.error())
            }
        }
    }
}
