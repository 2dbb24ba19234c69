//! [`Context`]-related definitions.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::{
    command::{self, Command as _},
    domain::user::{session, Session},
};
use tokio::sync::{Mutex, OnceCell};
use tracing as log;

use crate::{config, define_error, AsError, Error, JuniperResponse, Service};

/// Application context of a single GraphQL request.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Configuration of the session cookie.
    cookie: config::Cookie,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Cookies sent with the HTTP request.
    cookies: CookieJar,

    /// Outcome of authenticating the request cookie, done once at most.
    authenticated: OnceCell<Result<Session, Error>>,

    /// Change of the [`Session`] made by this request.
    ///
    /// Overrides the request cookie for the rest of the request, and is
    /// reflected in the response cookies.
    session_change: Mutex<Option<SessionChange>>,
}

/// Change of the [`Session`] made while resolving a request.
#[derive(Clone, Debug)]
enum SessionChange {
    /// New [`Session`] has been created for the client.
    Established(Session),

    /// [`Session`] of the client has been deleted.
    Destroyed,
}

impl Context {
    /// Creates a new [`Context`] of a request carrying the provided
    /// `cookies`.
    #[must_use]
    pub fn new(
        service: Service,
        cookie: config::Cookie,
        cookies: CookieJar,
    ) -> Self {
        Self {
            service,
            cookie,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            cookies,
            authenticated: OnceCell::new(),
            session_change: Mutex::new(None),
        }
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Makes the provided [`Session`] the current one for the rest of the
    /// request, and sets its cookie in the response.
    ///
    /// Replaces any [`Session`] the request has had before.
    pub async fn establish_session(&self, session: Session) {
        *self.session_change.lock().await =
            Some(SessionChange::Established(session));
    }

    /// Drops the current [`Session`] for the rest of the request, and removes
    /// its cookie in the response.
    pub async fn destroy_session(&self) {
        *self.session_change.lock().await = Some(SessionChange::Destroyed);
    }

    /// Tries to get the current [`Session`] for this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if the [`Session`] can't be checked.
    pub async fn try_current_session(&self) -> Result<Option<Session>, Error> {
        self.current_session().await.map(Some).or_else(|e| {
            if e.code == Error::from(AuthError::AuthorizationRequired).code {
                Ok(None)
            } else {
                Err(e)
            }
        })
    }

    /// Returns the current [`Session`] for this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the [`Session`] has been destroyed by this request;
    /// - the current HTTP request carries no valid session cookie;
    /// - the [`Session`] can't be checked.
    pub async fn current_session(&self) -> Result<Session, Error> {
        let change = self.session_change.lock().await.clone();
        match change {
            Some(SessionChange::Established(session)) => Ok(session),
            Some(SessionChange::Destroyed) => {
                Err(AuthError::AuthorizationRequired.into())
            }
            None => self
                .authenticated
                .get_or_init(|| self.do_authentication())
                .await
                .clone(),
        }
    }

    /// Performs the [`Session`] authentication by the request cookie.
    ///
    /// # Errors
    ///
    /// Errors if the cookie is missing, or its [`Session`] doesn't exist.
    async fn do_authentication(&self) -> Result<Session, Error> {
        let Some(token) = self
            .cookies
            .get(&self.cookie.name)
            .and_then(|c| session::Token::new(c.value()))
        else {
            return Err(AuthError::AuthorizationRequired.into());
        };

        self.service
            .execute(command::AuthorizeUserSession { token })
            .await
            .map_err(AsError::into_error)
            .map_err(self.error())
    }

    /// Converts this [`Context`] into the [`CookieJar`] to respond with.
    ///
    /// Only the changed cookies are sent back.
    #[must_use]
    pub fn into_cookies(self) -> CookieJar {
        let Self {
            cookie: conf,
            cookies,
            session_change,
            ..
        } = self;

        match session_change.into_inner() {
            None => cookies,
            Some(SessionChange::Established(session)) => {
                let expires = time::OffsetDateTime::from(session.expires_at);
                cookies.add(
                    Cookie::build((
                        conf.name,
                        AsRef::<str>::as_ref(&session.token).to_owned(),
                    ))
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .path("/")
                    .secure(conf.secure)
                    .expires(expires),
                )
            }
            Some(SessionChange::Destroyed) => {
                if cookies.get(&conf.name).is_none() {
                    return cookies;
                }
                log::debug!("removing session cookie");
                cookies.remove(Cookie::build(conf.name).path("/"))
            }
        }
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let missing = |what: &str| JuniperResponse {
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                Error::internal(&format!("missing `{what}` extension"))
                    .into_field_error(),
            )),
        };
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| missing("Service"))?;
        let cookie = parts
            .extensions
            .get::<config::Cookie>()
            .cloned()
            .ok_or_else(|| missing("config::Cookie"))?;

        Ok(Self::new(
            service,
            cookie,
            CookieJar::from_headers(&parts.headers),
        ))
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SessionNotExists | Self::UserNotExists(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::response::IntoResponse as _;
    use axum_extra::extract::cookie::CookieJar;
    use common::DateTime;
    use service::{
        domain::user::{self, session, Session},
        infra::{mailer, Postgres},
    };

    use crate::{config, Service};

    use super::Context;

    /// Creates a [`Context`] of a request carrying the provided `cookie`
    /// header.
    ///
    /// No connection is made unless a valid session cookie is checked.
    fn context(cookie: Option<&str>) -> Context {
        let db = Postgres::new(&config::Postgres::default().into()).unwrap();
        let (service, _) = Service::new(
            service::Config::default(),
            db.clone(),
            db,
            mailer::Log.into(),
        );
        let mut headers = http::HeaderMap::new();
        if let Some(c) = cookie {
            drop(headers.insert(http::header::COOKIE, c.parse().unwrap()));
        }
        Context::new(
            service,
            config::Cookie::default(),
            CookieJar::from_headers(&headers),
        )
    }

    fn session() -> Session {
        Session {
            token: session::Token::generate(),
            user_id: user::Id::new(),
            created_at: DateTime::now().coerce(),
            expires_at: (DateTime::now() + Duration::from_secs(3600)).coerce(),
        }
    }

    /// Returns the `Set-Cookie` headers the [`Context`] responds with.
    fn set_cookies(ctx: Context) -> Vec<String> {
        (ctx.into_cookies(), ())
            .into_response()
            .headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn established_session_sets_cookie() {
        let ctx = context(None);
        let alice = session();
        ctx.establish_session(alice.clone()).await;

        let cookies = set_cookies(ctx);

        assert_eq!(cookies.len(), 1);
        let cookie = &cookies[0];
        assert!(cookie.starts_with(&format!("qid={}", alice.token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn destroyed_session_removes_cookie() {
        let ctx = context(Some("qid=whatever"));
        ctx.destroy_session().await;

        let cookies = set_cookies(ctx);

        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("qid=;"));
        assert!(cookies[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn nothing_to_remove_without_cookie() {
        let ctx = context(None);
        ctx.destroy_session().await;

        assert!(set_cookies(ctx).is_empty());
    }

    #[tokio::test]
    async fn unchanged_session_sends_no_cookies() {
        assert!(set_cookies(context(Some("qid=whatever"))).is_empty());
    }

    #[tokio::test]
    async fn no_session_without_cookie() {
        let ctx = context(None);

        assert!(ctx.try_current_session().await.unwrap().is_none());
        assert_eq!(
            ctx.current_session().await.unwrap_err().code,
            "AUTHORIZATION_REQUIRED",
        );
    }

    #[tokio::test]
    async fn later_session_replaces_earlier() {
        let ctx = context(None);
        let (alice, bob) = (session(), session());

        ctx.establish_session(alice).await;
        ctx.establish_session(bob.clone()).await;

        assert_eq!(ctx.current_session().await.unwrap().token, bob.token);
    }

    #[tokio::test]
    async fn destroyed_session_is_not_current() {
        let ctx = context(None);
        ctx.establish_session(session()).await;
        assert!(ctx.try_current_session().await.unwrap().is_some());

        ctx.destroy_session().await;

        assert!(ctx.try_current_session().await.unwrap().is_none());
        assert_eq!(
            ctx.current_session().await.unwrap_err().code,
            "AUTHORIZATION_REQUIRED",
        );
    }

    #[tokio::test]
    async fn session_established_after_logout_is_current() {
        let ctx = context(None);
        ctx.establish_session(session()).await;
        ctx.destroy_session().await;
        let bob = session();

        ctx.establish_session(bob.clone()).await;

        assert_eq!(ctx.current_session().await.unwrap().token, bob.token);
        assert_eq!(set_cookies(ctx).len(), 1);
    }
}
