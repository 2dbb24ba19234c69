//! [`Log`] [`Mailer`] definition.

use common::operations::Deliver;
use tracerr::Traced;
use tracing as log;

use crate::infra::{
    mailer::{self, Letter},
    Mailer,
};

/// [`Mailer`] writing [`Letter`]s to the log instead of sending them.
///
/// Intended for development, when no SMTP server is configured. Bodies are
/// logged on `DEBUG` level only, as they may contain secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Mailer<Deliver<Letter>> for Log {
    type Ok = ();
    type Err = Traced<mailer::Error>;

    async fn execute(
        &self,
        Deliver(letter): Deliver<Letter>,
    ) -> Result<Self::Ok, Self::Err> {
        let Letter { to, subject, body } = letter;
        log::info!(%to, %subject, "letter is not sent: no SMTP configured");
        log::debug!(%to, %body, "letter body");
        Ok(())
    }
}
