//! [`FuzzPattern`] definition.

use derive_more::Display;
use itertools::Itertools as _;
use postgres_types::{FromSql, ToSql};

/// `SIMILAR TO` pattern matching a text containing any word of a search
/// query.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct FuzzPattern(String);

impl FuzzPattern {
    /// Characters having a special meaning in `SIMILAR TO` patterns.
    const SPECIAL: &'static [char] = &[
        '\\', '%', '_', '|', '*', '+', '?', '{', '}', '(', ')', '[', ']',
    ];

    /// Creates a new [`FuzzPattern`] out of the whitespace-separated words of
    /// the `query`, matching them literally.
    #[must_use]
    pub fn new(query: &str) -> Self {
        let alternatives = query
            .split_whitespace()
            .map(|word| {
                let mut escaped = String::with_capacity(word.len() + 2);
                escaped.push('%');
                for c in word.chars() {
                    if Self::SPECIAL.contains(&c) {
                        escaped.push('\\');
                    }
                    escaped.push(c);
                }
                escaped.push('%');
                escaped
            })
            .join("|");
        Self(format!("({alternatives})"))
    }
}

#[cfg(test)]
mod tests {
    use super::FuzzPattern;

    #[test]
    fn matches_any_word() {
        assert_eq!(
            FuzzPattern::new("  rust\tasync  io ").to_string(),
            "(%rust%|%async%|%io%)",
        );
    }

    #[test]
    fn escapes_pattern_syntax() {
        assert_eq!(
            FuzzPattern::new(r"100% a_b (c|d)\").to_string(),
            r"(%100\%%|%a\_b%|%\(c\|d\)\\%)",
        );
    }

    #[test]
    fn keeps_plain_punctuation() {
        assert_eq!(FuzzPattern::new("v1.0!").to_string(), "(%v1.0!%)");
    }
}
