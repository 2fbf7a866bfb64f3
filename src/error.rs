//! Error types for keygate.

use thiserror::Error;

/// Common error type for keygate.
///
/// Normal authentication failures (bad credentials, expired tokens,
/// fingerprint mismatches) are *not* surfaced through this type; they are
/// recovered locally into structured results such as
/// [`crate::session::SessionValidation`] so callers never see stack traces
/// for routine denials. This type covers configuration problems, collaborator
/// failures and programmer errors.
#[derive(Error, Debug)]
pub enum KeygateError {
    /// Token signing or verification infrastructure error.
    #[error("token error: {0}")]
    Token(#[from] crate::token::TokenError),

    /// Session lifecycle error.
    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),

    /// Guard registry error.
    #[error("guard error: {0}")]
    Guard(#[from] crate::guard::GuardError),

    /// Password hashing error.
    #[error("password error: {0}")]
    Password(#[from] crate::password::PasswordError),

    /// User store error.
    #[error("user store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for keygate operations.
pub type Result<T> = std::result::Result<T, KeygateError>;
