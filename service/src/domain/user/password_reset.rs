//! [`PasswordReset`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Pending request to reset a [`User`]'s password.
///
/// Whoever holds its [`Token`] until the expiration may set a new password
/// for the [`User`], once.
#[derive(Clone, Debug)]
pub struct PasswordReset {
    /// [`Token`] redeeming this [`PasswordReset`].
    pub token: Token,

    /// ID of the [`User`] whose password may be reset.
    pub user_id: user::Id,

    /// [`DateTime`] when this [`PasswordReset`] expires.
    pub expires_at: ExpirationDateTime,
}

/// One-time token of a [`PasswordReset`], sent to a [`User`] by email.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Token(String);

impl Token {
    /// Generates a new random [`Token`].
    #[must_use]
    pub fn generate() -> Self {
        Self(user::generate_token())
    }

    /// Parses a [`Token`] provided by a client.
    ///
    /// [`None`] is returned if the `token` couldn't have been generated by
    /// [`Token::generate()`].
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        user::is_token(&token).then_some(Self(token))
    }
}

/// [`DateTime`] when a [`PasswordReset`] expires.
pub type ExpirationDateTime = DateTimeOf<(PasswordReset, unit::Expiration)>;
