//! Session layer: client-held artifacts, lifecycle orchestration,
//! server-side revocation.

pub mod artifacts;
mod revocation;
mod service;

pub use artifacts::{
    ACCESS_TOKEN_COOKIE, FINGERPRINT_COOKIE, REFRESH_TOKEN_COOKIE, SESSION_ID_COOKIE,
};
pub use revocation::RevocationStore;
pub use service::{
    CreatedSession, RefreshOutcome, SessionError, SessionOptions, SessionService,
    SessionValidation,
};
