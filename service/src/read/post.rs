//! [`Post`] read model definition.
//!
//! [`Post`]: crate::domain::Post

pub mod list {
    //! [`Post`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::post;
    #[cfg(doc)]
    use crate::domain::Post;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = post::Id;

    /// Cursor pointing to a specific [`Post`] in a list.
    pub type Cursor = post::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// Words to fuzzy search for in [`post::Title`]s.
        pub title: Option<String>,
    }

    /// Total count of [`Post`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i64);
}
