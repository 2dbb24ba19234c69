//! Abstractions for [Relay]-style cursor pagination.
//!
//! [Relay]: https://relay.dev/graphql/connections.htm

/// Page of a paginated list.
#[derive(Clone, Debug)]
pub struct Connection<C, I> {
    /// [`Edge`]s in this [`Connection`] in the list order.
    pub edges: Vec<Edge<C, I>>,

    /// [`Kind`] of pagination produced this [`Connection`].
    pub kind: Kind,

    /// Indicator whether there are more nodes in the pagination direction.
    pub has_more: bool,
}

/// A page in a [`Connection`].
pub type Page<C, I> = Connection<C, I>;

impl<C, I> Connection<C, I> {
    /// Creates a new [`Connection`] from the [`Edge`]s fetched in the
    /// pagination direction.
    ///
    /// [`Edge`]s of a backward page are reversed, so the resulting
    /// [`Connection`] is always in the list order.
    #[must_use]
    pub fn new(
        args: &Arguments<C>,
        edges: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
        has_more: bool,
    ) -> Self {
        let mut edges = edges.into_iter().map(Into::into).collect::<Vec<_>>();
        let kind = args.kind();
        if kind == Kind::Backward {
            edges.reverse();
        }
        Self {
            edges,
            kind,
            has_more,
        }
    }

    /// Returns [`PageInfo`] of this [`Connection`].
    #[must_use]
    pub fn page_info(&self) -> PageInfo<C>
    where
        C: Clone,
    {
        PageInfo {
            start_cursor: self.edges.first().map(|e| e.cursor.clone()),
            end_cursor: self.edges.last().map(|e| e.cursor.clone()),
            has_next_page: self.has_more && self.kind == Kind::Forward,
            has_previous_page: self.has_more && self.kind == Kind::Backward,
        }
    }
}

/// Information about a page in a [`Connection`].
#[derive(Clone, Copy, Debug)]
pub struct PageInfo<C> {
    /// First cursor on this page.
    pub start_cursor: Option<C>,

    /// Last cursor on this page.
    pub end_cursor: Option<C>,

    /// Indicator whether [`Connection`] has a next page.
    pub has_next_page: bool,

    /// Indicator whether [`Connection`] has a previous page.
    pub has_previous_page: bool,
}

/// An edge in a [`Connection`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, I> {
    /// Cursor of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: I,
}

impl<C, I> From<(C, I)> for Edge<C, I> {
    fn from((cursor, node): (C, I)) -> Self {
        Self { cursor, node }
    }
}

/// Pagination arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arguments<C> {
    /// Forward pagination.
    Forward {
        /// Number of items to return.
        first: usize,

        /// Cursor after which to return items.
        after: Option<C>,
    },

    /// Backward pagination.
    Backward {
        /// Number of items to return.
        last: usize,

        /// Cursor before which to return items.
        before: Option<C>,
    },
}

impl<C> Arguments<C> {
    /// Creates new [`Arguments`] out of the raw GraphQL ones.
    ///
    /// [`None`] is returned if the combination is ambiguous (both directions
    /// requested) or the requested count is negative.
    pub fn new<Num>(
        first: Option<Num>,
        after: Option<C>,
        last: Option<Num>,
        before: Option<C>,
        default: Num,
    ) -> Option<Self>
    where
        Num: TryInto<usize>,
    {
        let forward = first.is_some() || after.is_some();
        let backward = last.is_some() || before.is_some();
        Some(match (forward, backward) {
            (true, true) => return None,
            (_, false) => Self::Forward {
                first: first.unwrap_or(default).try_into().ok()?,
                after,
            },
            (false, true) => Self::Backward {
                last: last.unwrap_or(default).try_into().ok()?,
                before,
            },
        })
    }

    /// Returns cursor requested by these [`Arguments`].
    #[must_use]
    pub fn cursor(&self) -> Option<&C> {
        match self {
            Self::Forward { after, .. } => after.as_ref(),
            Self::Backward { before, .. } => before.as_ref(),
        }
    }

    /// Returns [`Kind`] of pagination these [`Arguments`] request.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Forward { .. } => Kind::Forward,
            Self::Backward { .. } => Kind::Backward,
        }
    }

    /// Returns limit requested by these [`Arguments`].
    #[must_use]
    pub fn limit(&self) -> usize {
        match *self {
            Self::Forward { first, .. } => first,
            Self::Backward { last, .. } => last,
        }
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<C, F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments<C>,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Kind of pagination.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Forward pagination.
    Forward,

    /// Backward pagination.
    Backward,
}

impl Kind {
    /// Returns comparison operator selecting items past the cursor for a list
    /// sorted in the provided [`Order`].
    #[must_use]
    pub const fn operator(self, list: Order) -> &'static str {
        match (self, list) {
            (Self::Forward, Order::Ascending)
            | (Self::Backward, Order::Descending) => ">",
            (Self::Forward, Order::Descending)
            | (Self::Backward, Order::Ascending) => "<",
        }
    }

    /// Returns [`Order`] to fetch items in for a list sorted in the provided
    /// [`Order`].
    #[must_use]
    pub const fn order(self, list: Order) -> Order {
        match self {
            Self::Forward => list,
            Self::Backward => list.reversed(),
        }
    }
}

/// Order of items.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Order {
    /// Ascending order.
    Ascending,

    /// Descending order.
    Descending,
}

impl Order {
    /// Returns the opposite [`Order`].
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Returns SQL keyword representing this [`Order`].
    #[cfg(feature = "postgres")]
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Defines pagination types for a list of `$node`s pointed by `$cursor`s and
/// filtered by `$filter`.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge of a [`Connection`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Connection`] of nodes."]
        pub type Connection = $crate::pagination::Connection<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "An information about a [`Page`]."]
        pub type PageInfo = $crate::pagination::PageInfo<$cursor>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}

#[cfg(test)]
mod tests {
    use super::{Arguments, Connection, Kind, Order};

    #[test]
    fn defaults_to_forward() {
        assert_eq!(
            Arguments::<u8>::new(None, None, None, None, 10),
            Some(Arguments::Forward {
                first: 10,
                after: None,
            }),
        );
        assert_eq!(
            Arguments::new(None, Some(3_u8), None, None, 10),
            Some(Arguments::Forward {
                first: 10,
                after: Some(3),
            }),
        );
    }

    #[test]
    fn backward_when_only_last_or_before() {
        assert_eq!(
            Arguments::new(None, None, Some(5), Some(7_u8), 10),
            Some(Arguments::Backward {
                last: 5,
                before: Some(7),
            }),
        );
        assert_eq!(
            Arguments::new(None, None, None, Some(7_u8), 10).map(|a| a.limit()),
            Some(10),
        );
    }

    #[test]
    fn rejects_ambiguous_or_negative() {
        assert_eq!(Arguments::<u8>::new(Some(1), None, Some(1), None, 10), None);
        assert_eq!(Arguments::new(None, Some(1_u8), None, Some(2), 10), None);
        assert_eq!(Arguments::<u8>::new(Some(-1), None, None, None, 10), None);
    }

    #[test]
    fn backward_page_is_returned_in_list_order() {
        let args = Arguments::Backward {
            last: 2,
            before: Some(5_u8),
        };
        let page = Connection::<u8, u8>::new(&args, [(4, 4), (3, 3)], true);

        assert_eq!(
            page.edges.iter().map(|e| e.node).collect::<Vec<_>>(),
            [3, 4],
        );

        let info = page.page_info();
        assert_eq!(info.start_cursor, Some(3));
        assert_eq!(info.end_cursor, Some(4));
        assert!(info.has_previous_page);
        assert!(!info.has_next_page);
    }

    #[test]
    fn operators_follow_list_order() {
        assert_eq!(Kind::Forward.operator(Order::Descending), "<");
        assert_eq!(Kind::Backward.operator(Order::Descending), ">");
        assert_eq!(Kind::Forward.operator(Order::Ascending), ">");
        assert_eq!(
            Kind::Backward.order(Order::Descending),
            Order::Ascending,
        );
    }
}
