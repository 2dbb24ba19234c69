//! [`Mailer`]-related implementations.

mod log;
#[cfg(feature = "smtp")]
pub mod smtp;

use common::operations::Deliver;
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

use crate::domain::user;

#[cfg(feature = "smtp")]
pub use self::smtp::Smtp;
pub use self::log::Log;

/// Operation of delivering messages to their recipients.
pub use common::Handler as Mailer;

/// E-mail message to be [`Deliver`]ed.
#[derive(Clone, Debug)]
pub struct Letter {
    /// Recipient of this [`Letter`].
    pub to: user::Email,

    /// Subject line of this [`Letter`].
    pub subject: String,

    /// HTML body of this [`Letter`].
    pub body: String,
}

/// [`Mailer`] selected at runtime.
#[derive(Clone, Debug, From)]
pub enum Transport {
    /// [`Smtp`] delivery.
    #[cfg(feature = "smtp")]
    Smtp(Smtp),

    /// [`Log`] delivery.
    Log(Log),
}

impl Mailer<Deliver<Letter>> for Transport {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        op: Deliver<Letter>,
    ) -> Result<Self::Ok, Self::Err> {
        match self {
            #[cfg(feature = "smtp")]
            Self::Smtp(m) => m.execute(op).await.map_err(tracerr::wrap!()),
            Self::Log(m) => m.execute(op).await.map_err(tracerr::wrap!()),
        }
    }
}

/// [`Mailer`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Invalid sender or recipient address.
    #[cfg(feature = "smtp")]
    #[display("Invalid mailbox address: {_0}")]
    Address(lettre::address::AddressError),

    /// Failed to build a message.
    #[cfg(feature = "smtp")]
    #[display("Failed to build a message: {_0}")]
    Message(lettre::error::Error),

    /// SMTP transport error.
    #[cfg(feature = "smtp")]
    #[display("SMTP transport failed: {_0}")]
    Smtp(lettre::transport::smtp::Error),
}
