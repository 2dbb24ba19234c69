//! [`Error`]-related definitions.

use std::{fmt, num::TryFromIntError};

use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::{GraphQLObject, IntoFieldError};
use service::infra::{cache, database};
use tracerr::{Trace, Traced};

/// Defines a new error type convertible into an [`Error`] with a code.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_owned(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// GraphQL API [`Error`] with a code in its `extensions`.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let mut ext = juniper::Object::with_capacity(2);
        drop(
            ext.add_field("code", juniper::Value::scalar(self.code.to_owned())),
        );
        drop(
            ext.add_field(
                "backtrace",
                juniper::Value::list(
                    self.backtrace
                        .iter()
                        .flat_map(|trace| trace.iter())
                        .map(|frame| juniper::Value::scalar(frame.to_string()))
                        .collect(),
                ),
            ),
        );
        juniper::FieldError::new(self.message, juniper::Value::object(ext))
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`], falling back to an internal one.
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for cache::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for TryFromIntError {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

/// Validation failure of a single input field.
///
/// Returned as a part of a payload rather than as a GraphQL error, so a
/// client can show it next to the field.
#[derive(Clone, Debug, GraphQLObject)]
pub struct FieldError {
    /// Name of the input field.
    pub field: String,

    /// Human-readable description of what is wrong with the field.
    pub message: String,
}

impl FieldError {
    /// Creates a new [`FieldError`] of the provided `field`.
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

/// Helper trait for converting types into [`FieldError`]s.
pub trait AsFieldError {
    /// Tries to convert the type into a [`FieldError`].
    ///
    /// [`None`] is returned if the type doesn't describe a problem with the
    /// input, so should be reported as an [`Error`] instead.
    fn try_as_field_error(&self) -> Option<FieldError>;
}

impl<E: AsFieldError> AsFieldError for Traced<E> {
    fn try_as_field_error(&self) -> Option<FieldError> {
        self.as_ref().try_as_field_error()
    }
}

#[cfg(test)]
mod tests {
    use juniper::{DefaultScalarValue, IntoFieldError as _};

    use super::Error;

    crate::define_error! {
        enum TestError {
            #[code = "TEST_CODE"]
            #[status = CONFLICT]
            #[message = "Something conflicts"]
            Conflict,
        }
    }

    #[test]
    fn defined_error_carries_code_and_status() {
        let err = Error::from(TestError::Conflict);

        assert_eq!(err.code, "TEST_CODE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "[TEST_CODE]: Something conflicts");
    }

    #[test]
    fn code_lands_in_extensions() {
        let field: juniper::FieldError<DefaultScalarValue> =
            Error::internal(&"boom").into_field_error();

        assert_eq!(field.message(), "boom");
        assert_eq!(
            field
                .extensions()
                .as_object_value()
                .and_then(|o| o.get_field_value("code"))
                .and_then(|v| v.as_string_value()),
            Some("INTERNAL_SERVER_ERROR"),
        );
    }
}
