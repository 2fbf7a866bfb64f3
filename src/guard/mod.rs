//! Guard abstraction: interchangeable authentication strategies.
//!
//! The guard set is closed at compile time: a [`Guard`] is either the
//! cookie-backed [`SessionGuard`] or the bearer-token [`TokenGuard`]. The
//! [`AuthManager`] keys instances by name and dispatches guard-agnostic
//! calls to the configured default.

mod limiter;
mod manager;
mod session;
mod token;

use thiserror::Error;

use crate::session::SessionError;
use crate::store::{User, UserRecord};

pub use limiter::{LimitResult, LoginLimiter, LOCKOUT_DURATION_SECS, MAX_LOGIN_ATTEMPTS};
pub use manager::{AuthManager, AuthRuntime, SESSION_GUARD, TOKEN_GUARD};
pub use session::SessionGuard;
pub use token::TokenGuard;

/// Guard registry errors. These are programmer errors and propagate, unlike
/// routine authentication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// No guard is registered under this name.
    #[error("unknown guard: {0}")]
    UnknownGuard(String),
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// An authentication strategy for one transport.
pub enum Guard {
    /// Cookie-backed web session.
    Session(SessionGuard),
    /// Bearer-token API session.
    Token(TokenGuard),
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guard::Session(_) => f.write_str("Guard::Session"),
            Guard::Token(_) => f.write_str("Guard::Token"),
        }
    }
}

impl Guard {
    /// Resolve the current user.
    pub async fn user(&mut self) -> Option<User> {
        match self {
            Guard::Session(g) => g.user().await,
            Guard::Token(g) => g.user().await,
        }
    }

    /// Whether a user is authenticated.
    pub async fn check(&mut self) -> bool {
        match self {
            Guard::Session(g) => g.check().await,
            Guard::Token(g) => g.check().await,
        }
    }

    /// Whether the request is unauthenticated.
    pub async fn guest(&mut self) -> bool {
        match self {
            Guard::Session(g) => g.guest().await,
            Guard::Token(g) => g.guest().await,
        }
    }

    /// The current user's id, if any.
    pub async fn id(&mut self) -> Option<String> {
        match self {
            Guard::Session(g) => g.id().await,
            Guard::Token(g) => g.id().await,
        }
    }

    /// Check credentials without logging in.
    pub async fn validate(&mut self, credentials: &Credentials) -> bool {
        match self {
            Guard::Session(g) => g.validate(credentials).await,
            Guard::Token(g) => g.validate(credentials).await,
        }
    }

    /// Attempt a credential login.
    pub async fn attempt(&mut self, credentials: &Credentials, remember: bool) -> bool {
        match self {
            Guard::Session(g) => g.attempt(credentials, remember).await,
            Guard::Token(g) => g.attempt(credentials, remember).await,
        }
    }

    /// Log a user in.
    pub async fn login(&mut self, user: &UserRecord, remember: bool) -> Result<(), SessionError> {
        match self {
            Guard::Session(g) => g.login(user, remember).await,
            Guard::Token(g) => g.login(user, remember).await,
        }
    }

    /// Log in a user by id.
    pub async fn login_using_id(&mut self, id: &str, remember: bool) -> Option<User> {
        match self {
            Guard::Session(g) => g.login_using_id(id, remember).await,
            Guard::Token(g) => g.login_using_id(id, remember).await,
        }
    }

    /// Log out.
    pub async fn logout(&mut self) {
        match self {
            Guard::Session(g) => g.logout().await,
            Guard::Token(g) => g.logout().await,
        }
    }
}
