//! Infrastructure layer.

pub mod cache;
pub mod database;
pub mod mailer;

pub use self::{cache::Cache, database::Database, mailer::Mailer};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
