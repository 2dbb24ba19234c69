//! Operations [`Handler`]s are executed with.
//!
//! Each operation wraps the value it's applied to, so the same storage may
//! implement, for example, both `Handler<Insert<User>>` and
//! `Handler<Insert<Post>>`.

use std::marker::PhantomData;

use crate::Handler;

/// Declares newtype operations over a value.
macro_rules! operations {
    ($($(#[$attr:meta])* $name:ident),+ $(,)?) => {$(
        $(#[$attr])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name<T>(pub T);
    )+};
}

operations! {
    /// Storing a new value.
    Insert,

    /// Overwriting an already stored value.
    Update,

    /// Removing the stored values.
    Delete,

    /// Reading the stored values.
    Select,

    /// Locking the stored value until the current transaction ends.
    Lock,

    /// Starting a process running until the application stops.
    Start,

    /// Performing a single run of a process.
    Perform,

    /// Delivering a value (a letter, for example) to its recipient.
    Deliver,
}

/// Starting a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Storage returned by [`Transact`]ing the `T` one.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Committing a started transaction.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Selector of a `W`hat by a `B` value.
///
/// `W` only disambiguates operations selecting different things by the same
/// kind of value.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the selected value.
    _what: PhantomData<W>,

    /// Value to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] selector out of the provided value.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Unwraps the value to select by.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}

#[cfg(test)]
mod tests {
    use super::{By, Insert};

    #[test]
    fn by_keeps_selector_value() {
        let by = By::<Vec<u8>, _>::new("key");

        assert_eq!(by.into_inner(), "key");
    }

    #[test]
    fn operations_wrap_values() {
        let Insert(v) = Insert(7);

        assert_eq!(v, 7);
    }
}
