//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;
#[cfg(test)]
mod testing;

use std::time::Duration;

use common::operations::{By, Start};
use derive_more::Error;
use smart_default::SmartDefault;

#[cfg(doc)]
use self::{
    domain::user::{PasswordReset, Session},
    infra::{Cache, Database, Mailer},
};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Time a [`Session`] stays valid after being created.
    #[default(Duration::from_secs(3650 * 24 * 60 * 60))]
    pub session_ttl: Duration,

    /// [`PasswordReset`] configuration.
    pub password_reset: PasswordResetConfig,

    /// [`task::CleanExpired`] configuration.
    pub clean_expired: task::clean_expired::Config,
}

/// [`PasswordReset`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct PasswordResetConfig {
    /// Time a [`PasswordReset`] stays redeemable.
    #[default(Duration::from_secs(3 * 24 * 60 * 60))]
    pub ttl: Duration,

    /// Base URL of the page a [`PasswordReset`] is redeemed on.
    ///
    /// The token is appended to it as is.
    #[default("http://localhost:3000/change-password/".to_owned())]
    pub link: String,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Kv, Mail> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Cache`] of this [`Service`].
    cache: Kv,

    /// [`Mailer`] of this [`Service`].
    mailer: Mail,
}

impl<Db, Kv, Mail> Service<Db, Kv, Mail> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// Background [`Task`]s of the [`Service`] run inside the returned
    /// [`task::Background`], so it should be awaited.
    pub fn new(
        config: Config,
        database: Db,
        cache: Kv,
        mailer: Mail,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<By<task::CleanExpired<Self>, task::clean_expired::Config>>,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service {
            config,
            database,
            cache,
            mailer,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().clean_expired)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Cache`] of this [`Service`].
    #[must_use]
    pub fn cache(&self) -> &Kv {
        &self.cache
    }

    /// Returns [`Mailer`] of this [`Service`].
    #[must_use]
    pub fn mailer(&self) -> &Mail {
        &self.mailer
    }
}
