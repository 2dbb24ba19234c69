//! [`Handler`] abstraction.

use std::future::Future;

/// Something executing operations of the `Op` type asynchronously.
///
/// Commands, queries, storages, mailers and background tasks are all
/// [`Handler`]s, each implementing it once per operation it supports.
pub trait Handler<Op = ()> {
    /// Result of a successfully executed operation.
    type Ok;

    /// Error of a failed operation.
    type Err;

    /// Executes the provided `op`eration.
    fn execute(
        &self,
        op: Op,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
