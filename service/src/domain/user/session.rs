//! [`Session`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Server-side session of a [`User`].
#[derive(Clone, Debug)]
pub struct Session {
    /// [`Token`] identifying this [`Session`].
    pub token: Token,

    /// ID of the [`User`] this [`Session`] belongs to.
    pub user_id: user::Id,

    /// [`DateTime`] when this [`Session`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Checks whether this [`Session`] has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_elapsed()
    }
}

/// Opaque token identifying a [`Session`], carried by a client in a cookie.
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

/// [`DateTime`] when a [`Session`] was created.
pub type CreationDateTime = DateTimeOf<(Session, unit::Creation)>;

/// [`DateTime`] when a [`Session`] expires.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;
