//! Accounts, sessions, and the authorization checks built on them.

pub mod authorization;
pub mod email;
pub mod manager;
pub mod store;
pub mod token;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DatabaseError;

pub use authorization::{
    AdministratorAuthorizationHandler, AuthorizationError, AuthorizationHandler, UserAuthorizationHandler,
};
pub use email::{EmailSender, LoggingEmailSender};
pub use manager::{LocalUserManager, UserManager};
pub use store::{InMemoryUserStore, PgUserStore, UserRecord, UserStore};
pub use token::TokenIssuer;

/// What a signed-in user may see about their own account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub is_email_verified: bool,
    pub is_administrator: bool,
}

/// The token pair a client holds between requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSessionData {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasType {
    Username,
    Email,
}

/// A way of naming an account: its username or its email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub value: String,
    pub alias_type: AliasType,
}

impl Alias {
    pub fn username(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            alias_type: AliasType::Username,
        }
    }

    pub fn email(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            alias_type: AliasType::Email,
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Username {0} already exists.")]
    UsernameExists(String),

    #[error("Email {0} already exists.")]
    EmailExists(String),

    #[error("User {0} does not exist.")]
    UserNotFound(String),

    #[error("Password is incorrect.")]
    IncorrectPassword,

    #[error("Email address has not been verified.")]
    EmailNotVerified,

    #[error("Email address has already been verified.")]
    EmailAlreadyVerified,

    #[error("Verification code is incorrect.")]
    IncorrectVerificationCode,

    #[error("Access token has expired.")]
    AccessTokenExpired,

    #[error("Session has expired. Please sign in again.")]
    SessionExpired,

    #[error("Token is invalid.")]
    InvalidToken,

    #[error("User service misconfigured: {0}")]
    Configuration(String),

    #[error("Password hashing failed: {0}")]
    PasswordHashing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        UserError::Database(DatabaseError::Sqlx(err))
    }
}
