//! [`Smtp`] [`Mailer`] definition.

use common::operations::Deliver;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret as _, SecretString};
use tracerr::Traced;

use crate::infra::{
    mailer::{self, Letter},
    Mailer,
};

/// [`Smtp`] connection configuration.
#[derive(Debug)]
pub struct Config {
    /// Host of the SMTP relay.
    pub host: String,

    /// Port of the SMTP relay.
    pub port: u16,

    /// Username to authenticate with, if any.
    pub user: Option<String>,

    /// Password to authenticate with.
    pub password: SecretString,
}

/// [`Mailer`] sending [`Letter`]s through an SMTP relay with `STARTTLS`.
#[derive(Clone, Debug)]
pub struct Smtp {
    /// Pooled SMTP transport.
    transport: AsyncSmtpTransport<Tokio1Executor>,

    /// Sender of all the [`Letter`]s.
    from: Mailbox,
}

impl Smtp {
    /// Creates a new [`Smtp`] [`Mailer`] sending on behalf of `from`.
    ///
    /// No connection is established until the first [`Letter`] is sent.
    ///
    /// # Errors
    ///
    /// If `from` is not a valid mailbox or the relay can't be resolved.
    pub fn new(
        conf: &Config,
        from: &str,
    ) -> Result<Self, Traced<mailer::Error>> {
        let from = from
            .parse::<Mailbox>()
            .map_err(tracerr::from_and_wrap!(=> mailer::Error))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&conf.host)
                .map_err(tracerr::from_and_wrap!(=> mailer::Error))?
                .port(conf.port);
        if let Some(user) = &conf.user {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                conf.password.expose_secret().to_owned(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl Mailer<Deliver<Letter>> for Smtp {
    type Ok = ();
    type Err = Traced<mailer::Error>;

    async fn execute(
        &self,
        Deliver(letter): Deliver<Letter>,
    ) -> Result<Self::Ok, Self::Err> {
        let Letter { to, subject, body } = letter;

        let to = AsRef::<str>::as_ref(&to)
            .parse::<Mailbox>()
            .map_err(tracerr::from_and_wrap!(=> mailer::Error))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(tracerr::from_and_wrap!(=> mailer::Error))?;

        self.transport
            .send(message)
            .await
            .map_err(tracerr::from_and_wrap!(=> mailer::Error))
            .map(drop)
    }
}
