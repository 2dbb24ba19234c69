//! [`User`]-related definitions.

use std::fmt;

use common::DateTime;
use derive_more::{Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLInputObject, GraphQLObject, GraphQLScalar};
use service::{
    command::{
        create_user, create_user_session, request_password_reset,
        reset_user_password,
    },
    domain::{self, user},
    query, Query as _,
};
use tokio::sync::OnceCell;
use tracerr::Traced;
use uuid::Uuid;

use crate::{
    api, define_error, AsError, AsFieldError, Context, Error, FieldError,
};

/// A [`User`] of the blog.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`domain::User`] representing this [`User`], loaded lazily.
    user: OnceCell<domain::User>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            user: OnceCell::new_with(Some(user)),
        }
    }
}

impl User {
    /// Creates a new [`User`] with the provided ID, loaded on the first
    /// access.
    ///
    /// Accessing this [`User`] errors with `USER_NOT_EXISTS` code if there is
    /// no such [`User`].
    #[must_use]
    pub fn by_id(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            user: OnceCell::new(),
        }
    }

    /// Returns the [`domain::User`] representing this [`User`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::User`] doesn't exist.
    async fn user(&self, ctx: &Context) -> Result<&domain::User, Error> {
        let id = self.id.into();
        self.user
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::user::ById::by(id))
                    .map_err(AsError::into_error)
                    .and_then(|u| {
                        future::ready(
                            u.ok_or_else(|| UserError::NotExists.into()),
                        )
                    })
                    .map_err(ctx.error())
            })
            .await
    }
}

/// A `User` of the blog.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of this `User`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name this `User` logs in with.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.username",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn username(&self, ctx: &Context) -> Result<String, Error> {
        Ok(self.user(ctx).await?.username.to_string())
    }

    /// Email of this `User`.
    ///
    /// Visible to the `User` themself only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.email",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn email(&self, ctx: &Context) -> Result<Option<String>, Error> {
        let my_id = ctx.try_current_session().await?.map(|s| s.user_id);
        if my_id.map(Id::from) != Some(self.id) {
            return Ok(None);
        }
        Ok(Some(self.user(ctx).await?.email.to_string()))
    }

    /// `DateTime` when this `User` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.user(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `User` was updated last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.user(ctx).await?.updated_at.coerce())
    }
}

/// Unique identifier of a `User`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(user::Id)]
#[into(user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Credentials and contact info of a new `User`.
#[derive(Clone, GraphQLInputObject)]
pub struct UsernamePasswordInput {
    /// Name to log in with.
    pub username: String,

    /// Email to reset the password through.
    pub email: String,

    /// Password to log in with.
    pub password: String,
}

impl fmt::Debug for UsernamePasswordInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsernamePasswordInput")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of an operation authenticating a `User`.
///
/// Either `errors` or `user` is present.
#[derive(Clone, Debug, Default, GraphQLObject)]
#[graphql(context = Context)]
pub struct UserResponse {
    /// Problems with the provided input.
    pub errors: Option<Vec<FieldError>>,

    /// Authenticated `User`.
    pub user: Option<User>,
}

impl UserResponse {
    /// Creates a successful [`UserResponse`].
    #[must_use]
    pub fn ok(user: impl Into<User>) -> Self {
        Self {
            errors: None,
            user: Some(user.into()),
        }
    }

    /// Creates a [`UserResponse`] rejecting the input.
    #[must_use]
    pub fn failed(error: FieldError) -> Self {
        Self {
            errors: Some(vec![error]),
            user: None,
        }
    }

    /// Converts the provided `err`or into a [`UserResponse`] if it's caused by
    /// the input, or into an [`Error`] otherwise.
    ///
    /// # Errors
    ///
    /// If the `err`or isn't an input one.
    pub fn reject<E>(err: Traced<E>) -> Result<Self, Error>
    where
        E: AsError + AsFieldError + fmt::Display,
    {
        err.try_as_field_error()
            .map(Self::failed)
            .ok_or_else(|| err.into_error())
    }
}

/// Message of a too short input.
fn too_short(min_len: usize) -> String {
    format!("Length must be greater than {}", min_len - 1)
}

/// Message of a too long input.
fn too_long(max_len: usize) -> String {
    format!("Length must not exceed {max_len}")
}

/// [`FieldError`] of a violated [`user::Password`] rule.
fn password_error(
    field: &str,
    violation: user::PasswordViolation,
) -> FieldError {
    use user::PasswordViolation as V;

    FieldError::new(
        field,
        match violation {
            V::TooShort => too_short(user::Password::MIN_LEN),
            V::TooLong => too_long(user::Password::MAX_LEN),
        },
    )
}

/// [`FieldError`] of a [`User`] deleted in the middle of an operation.
fn user_gone() -> FieldError {
    FieldError::new("user", "User no longer exists")
}

impl AsError for create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hash(_)
            | Self::InvalidUsername(_)
            | Self::InvalidEmail
            | Self::InvalidPassword(_)
            | Self::UsernameOccupied(_)
            | Self::EmailOccupied(_) => None,
        }
    }
}

impl AsFieldError for create_user::ExecutionError {
    fn try_as_field_error(&self) -> Option<FieldError> {
        use user::{Username, UsernameViolation as V};

        Some(match self {
            Self::Db(_) | Self::Hash(_) => return None,
            Self::InvalidUsername(v) => FieldError::new(
                "username",
                match v {
                    V::TooShort => too_short(Username::MIN_LEN),
                    V::TooLong => too_long(Username::MAX_LEN),
                    V::At => "Cannot include an @".to_owned(),
                    V::Malformed => {
                        "Cannot have surrounding whitespace".to_owned()
                    }
                },
            ),
            Self::InvalidEmail => FieldError::new("email", "Invalid email"),
            Self::InvalidPassword(v) => password_error("password", *v),
            Self::UsernameOccupied(_) => {
                FieldError::new("username", "Username is already taken")
            }
            Self::EmailOccupied(_) => {
                FieldError::new("email", "Email is already taken")
            }
        })
    }
}

impl AsError for create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidUsernameOrEmail
            | Self::InvalidPassword
            | Self::UnknownUsernameOrEmail
            | Self::WrongPassword
            | Self::UserNotExists(_) => None,
        }
    }
}

impl AsFieldError for create_user_session::ExecutionError {
    fn try_as_field_error(&self) -> Option<FieldError> {
        Some(match self {
            Self::Db(_) => return None,
            Self::InvalidUsernameOrEmail => FieldError::new(
                "usernameOrEmail",
                too_short(user::Username::MIN_LEN),
            ),
            Self::InvalidPassword => FieldError::new(
                "password",
                too_short(user::Password::MIN_LEN),
            ),
            Self::UnknownUsernameOrEmail => FieldError::new(
                "usernameOrEmail",
                "This username or email does not exist",
            ),
            Self::WrongPassword => {
                FieldError::new("password", "Incorrect password")
            }
            Self::UserNotExists(_) => user_gone(),
        })
    }
}

impl AsError for request_password_reset::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for reset_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Cache(e) => e.try_as_error(),
            Self::Db(e) => e.try_as_error(),
            Self::Hash(_)
            | Self::InvalidPassword(_)
            | Self::InvalidToken
            | Self::UserNotExists(_) => None,
        }
    }
}

impl AsFieldError for reset_user_password::ExecutionError {
    fn try_as_field_error(&self) -> Option<FieldError> {
        Some(match self {
            Self::Cache(_) | Self::Db(_) | Self::Hash(_) => return None,
            Self::InvalidPassword(v) => password_error("newPassword", *v),
            Self::InvalidToken => {
                FieldError::new("token", "Token is invalid or expired")
            }
            Self::UserNotExists(_) => user_gone(),
        })
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` doesn't exist"]
        NotExists,
    }
}

#[cfg(test)]
mod tests {
    use service::{
        command::{create_user, create_user_session, reset_user_password},
        domain::user,
    };

    use super::UserResponse;

    #[test]
    fn input_errors_become_field_errors() {
        let res = UserResponse::reject(tracerr::new!(
            create_user::ExecutionError::InvalidUsername(
                user::UsernameViolation::At,
            )
        ))
        .unwrap();
        let errors = res.errors.unwrap();
        assert_eq!(errors[0].field, "username");
        assert_eq!(errors[0].message, "Cannot include an @");
        assert!(res.user.is_none());

        let res = UserResponse::reject(tracerr::new!(
            create_user_session::ExecutionError::InvalidPassword
        ))
        .unwrap();
        let errors = res.errors.unwrap();
        assert_eq!(errors[0].field, "password");
        assert_eq!(errors[0].message, "Length must be greater than 2");

        let res = UserResponse::reject(tracerr::new!(
            reset_user_password::ExecutionError::InvalidToken
        ))
        .unwrap();
        assert_eq!(res.errors.unwrap()[0].field, "token");
    }

    #[test]
    fn occupied_credentials_are_reported_per_field() {
        let res = UserResponse::reject(tracerr::new!(
            create_user::ExecutionError::EmailOccupied(
                "alice@example.com".parse().unwrap(),
            )
        ))
        .unwrap();
        let errors = res.errors.unwrap();

        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[0].message, "Email is already taken");
    }
}
