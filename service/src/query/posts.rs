//! [`Query`] collection related to the multiple [`Post`]s.

use common::operations::By;

#[cfg(doc)]
use crate::{domain::Post, Query};
use crate::read;

use super::DatabaseQuery;

/// Queries a list of [`Post`]s.
pub type List =
    DatabaseQuery<By<read::post::list::Page, read::post::list::Selector>>;

/// Queries total count of [`Post`]s matching a [`read::post::list::Filter`].
pub type TotalCount = DatabaseQuery<
    By<read::post::list::TotalCount, read::post::list::Filter>,
>;
