//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use service::infra::mailer;
use smart_default::SmartDefault;
use tracerr::Traced;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Mailer configuration.
    pub mailer: Mailer,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Checks the values which can't be expressed by their types alone.
    ///
    /// # Errors
    ///
    /// If any TTL exceeds [`MAX_TTL`] or a task interval is zero.
    fn validated(self) -> Result<Self, ConfigError> {
        let Service {
            session_ttl,
            password_reset: PasswordReset { ttl, .. },
            tasks: Tasks { clean_expired },
        } = &self.service;

        for (name, ttl) in [
            ("service.session_ttl", session_ttl),
            ("service.password_reset.ttl", ttl),
        ] {
            if *ttl > MAX_TTL {
                return Err(ConfigError::Message(format!(
                    "`{name}` must not exceed {MAX_TTL:?}",
                )));
            }
        }
        if clean_expired.interval.is_zero() {
            return Err(ConfigError::Message(
                "`service.tasks.clean_expired.interval` must not be zero"
                    .to_owned(),
            ));
        }

        Ok(self)
    }
}

/// Maximum TTL of sessions and password resets, keeping their expiration
/// within the representable dates.
pub const MAX_TTL: time::Duration =
    time::Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(4000)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,

    /// Session [`Cookie`] configuration.
    pub cookie: Cookie,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    ///
    /// `*` allows any origin by mirroring it back, as credentials are
    /// allowed.
    #[default(vec!["http://localhost:3000".to_owned()])]
    pub origins: Vec<String>,
}

/// Configuration of the cookie carrying a session token.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cookie {
    /// Name of the cookie.
    #[default("qid".to_owned())]
    pub name: String,

    /// Indicator whether the cookie is sent over HTTPS only.
    pub secure: bool,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Time a session stays valid after login.
    #[default(time::Duration::from_secs(3650 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Password reset configuration.
    pub password_reset: PasswordReset,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            session_ttl,
            password_reset: PasswordReset { ttl, link },
            tasks: Tasks { clean_expired },
        } = value;
        Self {
            session_ttl,
            password_reset: service::PasswordResetConfig { ttl, link },
            clean_expired: service::task::clean_expired::Config {
                interval: clean_expired.interval,
            },
        }
    }
}

/// Password reset configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct PasswordReset {
    /// Time a reset token stays redeemable.
    #[default(time::Duration::from_secs(3 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,

    /// Base URL of the page changing a password, the token is appended to.
    #[default("http://localhost:3000/change-password/".to_owned())]
    pub link: String,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `CleanExpired` task configuration.
    pub clean_expired: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("lidit".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Mailer configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Mailer {
    /// Sender of the letters.
    #[default("Lidit <noreply@lidit.local>".to_owned())]
    pub from: String,

    /// SMTP relay to send letters through.
    ///
    /// Letters are only logged if absent.
    pub smtp: Option<Smtp>,
}

impl Mailer {
    /// Builds the [`mailer::Transport`] described by this [`Mailer`]
    /// configuration.
    ///
    /// # Errors
    ///
    /// If the SMTP relay can't be set up with the provided parameters.
    pub fn transport(self) -> Result<mailer::Transport, Traced<mailer::Error>> {
        let Self { from, smtp } = self;
        Ok(match smtp {
            Some(Smtp {
                host,
                port,
                user,
                password,
            }) => mailer::Smtp::new(
                &mailer::smtp::Config {
                    host,
                    port,
                    user,
                    password: SecretString::from(password),
                },
                &from,
            )?
            .into(),
            None => mailer::Log.into(),
        })
    }
}

/// SMTP relay configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Smtp {
    /// Host of the relay.
    pub host: String,

    /// Port of the relay.
    #[default(587)]
    pub port: u16,

    /// User to authenticate as.
    pub user: Option<String>,

    /// Password to authenticate with.
    pub password: String,
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config::ConfigError;

    use super::{Config, MAX_TTL};

    #[test]
    fn defaults_without_file() {
        let conf = Config::new("definitely-missing.toml").unwrap();

        assert_eq!(conf.server.port, 4000);
        assert_eq!(conf.server.cookie.name, "qid");
        assert!(!conf.server.cookie.secure);
        assert_eq!(conf.server.cors.origins, ["http://localhost:3000"]);
        assert!(conf.mailer.smtp.is_none());

        let service = service::Config::from(conf.service);
        assert_eq!(service.password_reset.ttl, Duration::from_secs(259_200));
        assert_eq!(
            service.clean_expired.interval,
            Duration::from_secs(60 * 60),
        );
    }

    fn message(err: ConfigError) -> String {
        match err {
            ConfigError::Message(m) => m,
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn rejects_overflowing_ttl() {
        let mut conf = Config::default();
        conf.service.session_ttl = MAX_TTL;
        assert!(conf.clone().validated().is_ok());

        conf.service.session_ttl = Duration::MAX;
        let err = message(conf.clone().validated().unwrap_err());
        assert!(err.contains("service.session_ttl"), "{err}");

        conf.service.session_ttl = MAX_TTL;
        conf.service.password_reset.ttl = MAX_TTL + Duration::from_secs(1);
        let err = message(conf.validated().unwrap_err());
        assert!(err.contains("service.password_reset.ttl"), "{err}");
    }

    #[test]
    fn rejects_zero_interval() {
        let mut conf = Config::default();
        conf.service.tasks.clean_expired.interval = Duration::ZERO;

        let err = message(conf.validated().unwrap_err());
        assert!(err.contains("clean_expired.interval"), "{err}");
    }
}
