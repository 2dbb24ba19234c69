//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute of a string-like
/// scalar wrapping a domain type `As`.
///
/// Output uses the [`Display`] impl of `As`, while input is validated by its
/// [`FromStr`] impl, so invalid values are rejected before reaching a
/// resolver.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Converts the scalar into an output [`Value`].
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Parses the scalar from an [`InputValue`].
    ///
    /// # Errors
    ///
    /// If the input is not a string, or is not a valid `As`.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: From<As> + GraphQLType<S, TypeInfo = ()>,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("<unnamed>");
        let s = input.as_string_value().ok_or_else(|| {
            format!("Expected `{name}` to be a string, found: {input}")
        })?;
        s.parse::<As>()
            .map(T::from)
            .map_err(|e| format!("Invalid `{name}` \"{s}\": {e}"))
    }

    /// Parses the provided [`ScalarToken`] as a string.
    ///
    /// # Errors
    ///
    /// If the token is not a string.
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}
