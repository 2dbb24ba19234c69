//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_post;
pub mod create_user;
pub mod create_user_session;
pub mod delete_post;
pub mod delete_user_session;
pub mod request_password_reset;
pub mod reset_user_password;
pub mod update_post;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_post::CreatePost,
    create_user::CreateUser, create_user_session::CreateUserSession,
    delete_post::DeletePost, delete_user_session::DeleteUserSession,
    request_password_reset::RequestPasswordReset,
    reset_user_password::ResetUserPassword, update_post::UpdatePost,
};
