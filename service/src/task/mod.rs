//! Background [`Task`]s definitions.

mod background;
pub mod clean_expired;

pub use common::Handler as Task;

pub use self::{background::Background, clean_expired::CleanExpired};
