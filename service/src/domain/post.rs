//! [`Post`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

use crate::domain::user;
#[cfg(doc)]
use crate::domain::User;

/// Blog post written by a [`User`].
#[derive(Clone, Debug)]
pub struct Post {
    /// ID of this [`Post`].
    pub id: Id,

    /// [`Title`] of this [`Post`].
    pub title: Title,

    /// ID of the [`User`] who wrote this [`Post`].
    pub author_id: user::Id,

    /// [`DateTime`] when this [`Post`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Post`] was updated last time.
    pub updated_at: ModificationDateTime,
}

/// ID of a [`Post`].
///
/// Ordered by the creation time, so newer [`Post`]s have greater [`Id`]s.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new [`Id`] greater than all the previously created ones.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

/// Title of a [`Post`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Maximal number of characters in a [`Title`].
    pub const MAX_LEN: usize = 255;

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        !title.is_empty()
            && title.trim() == title
            && title.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// [`DateTime`] when a [`Post`] was created.
pub type CreationDateTime = DateTimeOf<(Post, unit::Creation)>;

/// [`DateTime`] when a [`Post`] was updated last time.
pub type ModificationDateTime = DateTimeOf<(Post, unit::Modification)>;

#[cfg(test)]
mod tests {
    use super::{Id, Title};

    #[test]
    fn ids_grow() {
        let first = Id::new();
        let second = Id::new();

        assert!(second > first);
    }

    #[test]
    fn title_rules() {
        assert!(Title::new("Hello, world").is_some());
        assert!(Title::new("x".repeat(255)).is_some());

        assert!(Title::new("").is_none());
        assert!(Title::new(" padded ").is_none());
        assert!(Title::new("x".repeat(256)).is_none());
    }
}
