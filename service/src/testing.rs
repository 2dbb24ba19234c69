//! In-memory doubles of the infrastructure for [`Service`] tests.
//!
//! [`Service`]: crate::Service

use std::{collections::HashMap, sync::Arc};

use common::operations::{
    By, Commit, Delete, Deliver, Insert, Lock, Select, Transact, Update,
};
use secrecy::SecretBox;
use tokio::sync::Mutex;
use tracerr::Traced;

use crate::{
    command::{create_user_session, CreateUser, CreateUserSession},
    domain::{
        post,
        user::{self, session, Session},
        Post, User,
    },
    infra::{
        cache,
        database::{self, constraint},
        mailer::{self, Letter},
    },
    Command as _, Config,
};

/// [`crate::Service`] backed by the test doubles.
pub(crate) type Service = crate::Service<Database, cache::Memory, Mailer>;

/// Password every [`register()`]ed [`User`] has.
pub(crate) const PASSWORD: &str = "wonderland";

/// Creates a new [`Service`] with empty storages.
pub(crate) fn service() -> Service {
    crate::Service {
        config: Config::default(),
        database: Database::default(),
        cache: cache::Memory::new(),
        mailer: Mailer::default(),
    }
}

/// Registers a new [`User`] having the [`PASSWORD`].
pub(crate) async fn register(
    svc: &Service,
    username: &str,
    email: &str,
) -> User {
    svc.execute(CreateUser {
        username: username.to_owned(),
        email: email.to_owned(),
        password: SecretBox::new(Box::new(PASSWORD.into())),
    })
    .await
    .unwrap()
}

/// Logs in a [`register()`]ed [`User`].
pub(crate) async fn login(
    svc: &Service,
    username: &str,
) -> create_user_session::Output {
    svc.execute(CreateUserSession::ByCredentials {
        username_or_email: username.to_owned(),
        password: SecretBox::new(Box::new(PASSWORD.into())),
    })
    .await
    .unwrap()
}

/// Extracts a password reset token from the link in the provided [`Letter`].
pub(crate) fn reset_token(letter: &Letter) -> Option<String> {
    let link = &Config::default().password_reset.link;
    let (_, rest) = letter.body.split_once(link.as_str())?;
    rest.split('"').next().map(ToOwned::to_owned)
}

/// Stored entities of a [`Database`].
#[derive(Debug, Default)]
struct State {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Session`]s.
    sessions: HashMap<session::Token, Session>,

    /// Stored [`Post`]s.
    posts: HashMap<post::Id, Post>,

    /// Whether the next [`Update`] of a [`User`] fails.
    fail_user_update: bool,
}

/// In-memory [`database::Database`].
///
/// Transactions share the state with the outer [`Database`] and are never
/// rolled back.
#[derive(Clone, Debug, Default)]
pub(crate) struct Database(Arc<Mutex<State>>);

impl Database {
    /// Stores the provided [`Session`] as is.
    pub(crate) async fn put_session(&self, session: Session) {
        drop(
            self.0
                .lock()
                .await
                .sessions
                .insert(session.token.clone(), session),
        );
    }

    /// Returns tokens of all the stored [`Session`]s, expired included.
    pub(crate) async fn session_tokens(&self) -> Vec<session::Token> {
        self.0.lock().await.sessions.keys().cloned().collect()
    }

    /// Makes the next [`Update`] of a [`User`] fail without storing it.
    pub(crate) async fn fail_next_user_update(&self) {
        self.0.lock().await.fail_user_update = true;
    }

    /// Returns number of the stored [`User`]s.
    pub(crate) async fn users_count(&self) -> usize {
        self.0.lock().await.users.len()
    }
}

/// Result of a [`Database`] operation.
type Result<T> = std::result::Result<T, Traced<database::Error>>;

impl database::Database<Transact> for Database {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self> {
        Ok(self.clone())
    }
}

impl database::Database<Commit> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<()> {
        Ok(())
    }
}

impl database::Database<Select<By<Option<User>, user::Id>>> for Database {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Option<User>> {
        Ok(self.0.lock().await.users.get(&by.into_inner()).cloned())
    }
}

impl<'u> database::Database<Select<By<Option<User>, &'u user::Username>>>
    for Database
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'u user::Username>>,
    ) -> Result<Option<User>> {
        let username = by.into_inner();
        Ok(self
            .0
            .lock()
            .await
            .users
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }
}

impl<'e> database::Database<Select<By<Option<User>, &'e user::Email>>>
    for Database
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Option<User>> {
        let email = by.into_inner();
        Ok(self
            .0
            .lock()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }
}

impl database::Database<Insert<User>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(user): Insert<User>) -> Result<()> {
        let mut state = self.0.lock().await;
        let taken = |f: fn(&User, &User) -> bool| {
            state.users.values().any(|u| f(u, &user))
        };
        let violated = if taken(|a, b| a.username == b.username) {
            Some(constraint::USERS_USERNAME)
        } else if taken(|a, b| a.email == b.email) {
            Some(constraint::USERS_EMAIL)
        } else {
            None
        };
        if let Some(c) = violated {
            return Err(tracerr::new!(database::Error::UniqueViolation(
                c.to_owned()
            )));
        }
        drop(state.users.insert(user.id, user));
        Ok(())
    }
}

impl database::Database<Update<User>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(user): Update<User>) -> Result<()> {
        let mut state = self.0.lock().await;
        if std::mem::take(&mut state.fail_user_update) {
            return Err(tracerr::new!(database::Error::UniqueViolation(
                constraint::USERS_EMAIL.to_owned()
            )));
        }
        drop(state.users.insert(user.id, user));
        Ok(())
    }
}

impl database::Database<Lock<By<User, user::Id>>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<User, user::Id>>) -> Result<()> {
        Ok(())
    }
}

impl database::Database<Insert<Session>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(session): Insert<Session>) -> Result<()> {
        self.put_session(session).await;
        Ok(())
    }
}

impl<'t> database::Database<Select<By<Option<Session>, &'t session::Token>>>
    for Database
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, &'t session::Token>>,
    ) -> Result<Option<Session>> {
        Ok(self
            .0
            .lock()
            .await
            .sessions
            .get(by.into_inner())
            .filter(|s| !s.is_expired())
            .cloned())
    }
}

impl<'t> database::Database<Delete<By<Option<Session>, &'t session::Token>>>
    for Database
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Option<Session>, &'t session::Token>>,
    ) -> Result<Option<Session>> {
        Ok(self.0.lock().await.sessions.remove(by.into_inner()))
    }
}

impl database::Database<Delete<By<Session, session::ExpirationDateTime>>>
    for Database
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::ExpirationDateTime>>,
    ) -> Result<()> {
        let deadline = by.into_inner();
        self.0
            .lock()
            .await
            .sessions
            .retain(|_, s| s.expires_at > deadline);
        Ok(())
    }
}

impl database::Database<Select<By<Option<Post>, post::Id>>> for Database {
    type Ok = Option<Post>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Post>, post::Id>>,
    ) -> Result<Option<Post>> {
        Ok(self.0.lock().await.posts.get(&by.into_inner()).cloned())
    }
}

impl database::Database<Insert<Post>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(post): Insert<Post>) -> Result<()> {
        drop(self.0.lock().await.posts.insert(post.id, post));
        Ok(())
    }
}

impl database::Database<Update<Post>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(post): Update<Post>) -> Result<()> {
        drop(self.0.lock().await.posts.insert(post.id, post));
        Ok(())
    }
}

impl database::Database<Delete<By<Post, post::Id>>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Post, post::Id>>,
    ) -> Result<()> {
        drop(self.0.lock().await.posts.remove(&by.into_inner()));
        Ok(())
    }
}

impl database::Database<Lock<By<Post, post::Id>>> for Database {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<Post, post::Id>>) -> Result<()> {
        Ok(())
    }
}

/// [`mailer::Mailer`] remembering the [`Letter`]s instead of sending them.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mailer(Arc<Mutex<Vec<Letter>>>);

impl Mailer {
    /// Returns all the [`Letter`]s sent so far.
    pub(crate) async fn sent(&self) -> Vec<Letter> {
        self.0.lock().await.clone()
    }
}

impl mailer::Mailer<Deliver<Letter>> for Mailer {
    type Ok = ();
    type Err = Traced<mailer::Error>;

    async fn execute(
        &self,
        Deliver(letter): Deliver<Letter>,
    ) -> std::result::Result<(), Traced<mailer::Error>> {
        self.0.lock().await.push(letter);
        Ok(())
    }
}
