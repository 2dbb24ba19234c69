//! [`User`] definitions.

pub mod password_reset;
pub mod session;

use std::sync::LazyLock;

use argon2::{
    password_hash::{self, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};
#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng as _};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use uuid::Uuid;

pub use self::{password_reset::PasswordReset, session::Session};

/// Registered user.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Username`] of this [`User`].
    pub username: Username,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`User`] was updated last time.
    pub updated_at: ModificationDateTime,
}

/// ID of a [`User`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, FromStr, Hash, Into, PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name a [`User`] logs in with.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Username(String);

impl Username {
    /// Minimal number of characters in a [`Username`].
    pub const MIN_LEN: usize = 3;

    /// Maximal number of characters in a [`Username`].
    pub const MAX_LEN: usize = 64;

    /// Creates a new [`Username`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).is_ok().then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Username`].
    ///
    /// # Errors
    ///
    /// With the first [`UsernameViolation`] found.
    pub fn check(name: impl AsRef<str>) -> Result<(), UsernameViolation> {
        let name = name.as_ref();
        let len = name.chars().count();
        if len < Self::MIN_LEN {
            return Err(UsernameViolation::TooShort);
        }
        if len > Self::MAX_LEN {
            return Err(UsernameViolation::TooLong);
        }
        if name.contains('@') {
            return Err(UsernameViolation::At);
        }
        if name.trim() != name || name.chars().any(char::is_control) {
            return Err(UsernameViolation::Malformed);
        }
        Ok(())
    }
}

impl FromStr for Username {
    type Err = UsernameViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::check(s).map(|()| Self(s.to_owned()))
    }
}

/// Reason of a string not being a valid [`Username`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum UsernameViolation {
    /// Less than [`Username::MIN_LEN`] characters.
    #[display("shorter than {} characters", Username::MIN_LEN)]
    TooShort,

    /// More than [`Username::MAX_LEN`] characters.
    #[display("longer than {} characters", Username::MAX_LEN)]
    TooLong,

    /// Contains `@`, which is reserved for [`Email`]s.
    #[display("contains `@`")]
    At,

    /// Surrounded by whitespace or contains control characters.
    #[display("malformed")]
    Malformed,
}

/// Email address of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [RFC 822] address format.
        ///
        /// [RFC 822]: https://www.rfc-editor.org/rfc/rfc822#section-6
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Plaintext password of a [`User`].
///
/// Never persisted, and should be kept inside a [`secrecy::SecretBox`] while
/// travelling through the service.
#[derive(Clone, Debug, Eq, From, PartialEq)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Minimal number of characters in a [`Password`].
    pub const MIN_LEN: usize = 3;

    /// Maximal number of characters in a [`Password`].
    pub const MAX_LEN: usize = 128;

    /// Checks whether this [`Password`] satisfies the length requirements.
    ///
    /// # Errors
    ///
    /// With the [`PasswordViolation`] found.
    pub fn check(&self) -> Result<(), PasswordViolation> {
        let len = self.0.chars().count();
        if len < Self::MIN_LEN {
            return Err(PasswordViolation::TooShort);
        }
        if len > Self::MAX_LEN {
            return Err(PasswordViolation::TooLong);
        }
        Ok(())
    }
}

/// Reason of a [`Password`] being unacceptable.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PasswordViolation {
    /// Less than [`Password::MIN_LEN`] characters.
    #[display("shorter than {} characters", Password::MIN_LEN)]
    TooShort,

    /// More than [`Password::MAX_LEN`] characters.
    #[display("longer than {} characters", Password::MAX_LEN)]
    TooLong,
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// [Argon2] hash of a [`Password`] in the [PHC string format].
///
/// [Argon2]: https://en.wikipedia.org/wiki/Argon2
/// [PHC string format]: https://github.com/P-H-C/phc-string-format
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the given [`Password`] with a random salt.
    ///
    /// # Errors
    ///
    /// If [`Argon2`] fails to produce a hash.
    pub fn new(password: &Password) -> Result<Self, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
    }

    /// Checks whether the given [`Password`] matches this [`PasswordHash`].
    ///
    /// Malformed hashes never match.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &hash)
                .is_ok()
        })
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when a [`User`] was updated last time.
pub type ModificationDateTime = DateTimeOf<(User, unit::Modification)>;

/// Generates a new random unguessable token of [`TOKEN_LEN`] alphanumeric
/// characters.
fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Checks whether the given string may be a token produced by
/// [`generate_token()`].
fn is_token(s: &str) -> bool {
    s.len() == TOKEN_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Length of the tokens produced by [`generate_token()`].
const TOKEN_LEN: usize = 48;

#[cfg(test)]
mod tests {
    use super::{
        generate_token, is_token, Email, Password, PasswordHash,
        PasswordViolation, Username, UsernameViolation,
    };

    #[test]
    fn username_rules() {
        assert!(Username::new("bob").is_some());
        assert!(Username::new("Bob the Builder").is_some());

        assert_eq!(Username::check("bo"), Err(UsernameViolation::TooShort));
        assert_eq!(
            Username::check("b".repeat(65)),
            Err(UsernameViolation::TooLong),
        );
        assert_eq!(Username::check("bob@home"), Err(UsernameViolation::At));
        assert_eq!(Username::check(" bob"), Err(UsernameViolation::Malformed));
        assert_eq!(
            Username::check("bo\u{7}b"),
            Err(UsernameViolation::Malformed),
        );
    }

    #[test]
    fn email_format() {
        assert!(Email::new("bob@example.com").is_some());
        assert!(Email::new("bob.builder+tag@mail.example.org").is_some());

        assert!(Email::new("bob").is_none());
        assert!(Email::new("bob@").is_none());
        assert!(Email::new("@example.com").is_none());
        assert!(Email::new("bob @example.com").is_none());
    }

    #[test]
    fn password_length() {
        assert_eq!(Password::from("abc").check(), Ok(()));
        assert_eq!(
            Password::from("ab").check(),
            Err(PasswordViolation::TooShort),
        );
        assert_eq!(
            Password::from("a".repeat(129)).check(),
            Err(PasswordViolation::TooLong),
        );
    }

    #[test]
    fn hash_verifies_only_original_password() {
        let hash = PasswordHash::new(&"correct horse".into()).unwrap();

        assert!(hash.verify(&"correct horse".into()));
        assert!(!hash.verify(&"battery staple".into()));
        assert_ne!(hash.to_string(), "correct horse");
    }

    #[test]
    fn hash_is_salted() {
        let password = Password::from("same password");

        assert_ne!(
            PasswordHash::new(&password).unwrap(),
            PasswordHash::new(&password).unwrap(),
        );
    }

    #[test]
    fn tokens_are_random_and_recognizable() {
        let (a, b) = (generate_token(), generate_token());

        assert!(is_token(&a));
        assert!(is_token(&b));
        assert_ne!(a, b);

        assert!(!is_token("short"));
        assert!(!is_token(&"-".repeat(48)));
    }
}
