//! Keygate - authentication and session-security core.
//!
//! Signed claim tokens bound to a client fingerprint, session lifecycle
//! orchestration over cookie artifacts, cookie and bearer guards behind one
//! capability surface, and HTTP middleware for route protection.

pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod logging;
pub mod password;
pub mod session;
pub mod store;
pub mod token;
pub mod web;

pub use config::{AccessCookieLifetime, AuthConfig, Config, LoggingConfig};
pub use context::{ClientInfo, RequestContext};
pub use error::{KeygateError, Result};
pub use guard::{
    AuthManager, AuthRuntime, Credentials, Guard, GuardError, LimitResult, LoginLimiter,
    SessionGuard, TokenGuard, SESSION_GUARD, TOKEN_GUARD,
};
pub use password::{validate_password, Argon2Hasher, PasswordError, PasswordHasher};
pub use session::{
    CreatedSession, RefreshOutcome, RevocationStore, SessionError, SessionOptions, SessionService,
    SessionValidation,
};
pub use store::{InMemoryUserStore, StoreError, User, UserRecord, UserStore};
pub use token::{
    generate_fingerprint, AccessClaims, ConfigSecretProvider, RefreshClaims, SecretProvider,
    TokenCodec, TokenError,
};
pub use web::{AuthLayerState, AuthenticatedUser, AuthorizationGate, ClaimsGate};
