//! HTTP-facing layer: middleware and API error responses.

pub mod error;
pub mod middleware;

pub use error::{ApiError, ErrorCode};
pub use middleware::{
    authenticate, authorize, ensure_email_verified, AuthLayerState, AuthenticatedUser,
    AuthorizationGate, ClaimsGate,
};
