//! HTTP authentication and authorization middleware.
//!
//! `authenticate` resolves the caller's identity from a bearer header or the
//! access cookie, verifies the token and its fingerprint binding, and inserts
//! an [`AuthenticatedUser`] extension for downstream handlers. `authorize`
//! and `ensure_email_verified` layer additional checks on top of it.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{
        header::{ACCEPT, AUTHORIZATION, USER_AGENT},
        request::Parts,
        HeaderMap, Request,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::session::artifacts;
use crate::store::{User, UserStore};
use crate::token::{generate_fingerprint, TokenCodec};
use crate::web::error::ApiError;

/// Decides whether a user may perform a named ability.
#[async_trait::async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// Returns true when `user` is allowed to perform `ability`.
    async fn allows(&self, user: &User, ability: &str) -> bool;
}

/// Gate that checks the user's role and permission list from the token.
pub struct ClaimsGate;

#[async_trait::async_trait]
impl AuthorizationGate for ClaimsGate {
    async fn allows(&self, user: &User, ability: &str) -> bool {
        if user.role.as_deref() == Some("admin") {
            return true;
        }
        user.permissions.iter().any(|p| p == ability)
    }
}

/// Shared state for the auth middleware stack.
#[derive(Clone)]
pub struct AuthLayerState {
    /// Token codec for signature verification.
    pub codec: Arc<TokenCodec>,
    /// Auth configuration.
    pub config: Arc<AuthConfig>,
    /// User store for account-level checks.
    pub store: Arc<dyn UserStore>,
    /// Authorization gate for ability checks.
    pub gate: Arc<dyn AuthorizationGate>,
}

/// Identity resolved by [`authenticate`] for the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or_else(|| ApiError::unauthorized("Authentication required"))
        })
    }
}

/// True when the request should get JSON errors rather than redirects.
fn is_api_request(path: &str, headers: &HeaderMap) -> bool {
    if path.starts_with("/api/") || path == "/api" {
        return true;
    }
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

fn unauthorized_response(path: &str, headers: &HeaderMap, message: &str) -> Response {
    if is_api_request(path, headers) {
        ApiError::unauthorized(message).into_response()
    } else {
        let target = format!("/login?next={}", urlencoding::encode(path));
        Redirect::to(&target).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Fingerprint input for the current request.
///
/// The client address comes from `x-forwarded-for` when present, matching
/// what the issuing side saw behind the same proxy.
fn request_client(headers: &HeaderMap) -> (String, String) {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let client_addr = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
        .unwrap_or_default();
    (user_agent, client_addr)
}

/// Authentication middleware.
///
/// In trusted-proxy mode a present upstream identity header is taken at
/// face value; the deployment must guarantee the header cannot be set by
/// clients. Requests without the header, and all requests outside that
/// mode, are verified from the bearer header (which wins over the access
/// cookie), and the token's fingerprint must match one recomputed from
/// this request.
pub async fn authenticate(
    state: Arc<AuthLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let headers = request.headers().clone();

    if state.config.trust_upstream_identity {
        let marker = headers
            .get(state.config.upstream_identity_header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());
        // A present marker is authoritative; an absent one falls through to
        // the bearer/cookie path so direct API clients still authenticate.
        if let Some(user_id) = marker {
            let user = match state.store.find_by_id(&user_id).await {
                Ok(Some(record)) if record.is_active => User::from(&record),
                Ok(_) => {
                    return unauthorized_response(&path, &headers, "Authentication required");
                }
                Err(err) => {
                    tracing::error!("User store lookup failed: {err}");
                    return ApiError::internal("An internal error occurred").into_response();
                }
            };
            request.extensions_mut().insert(AuthenticatedUser(user));
            return next.run(request).await;
        }
    }

    let token = bearer_token(&headers).or_else(|| {
        let jar = CookieJar::from_headers(&headers);
        artifacts::read_access_token(&jar)
    });
    let Some(token) = token else {
        return unauthorized_response(&path, &headers, "Authentication required");
    };

    let claims = match state.codec.verify_access(&token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!("Access token rejected: {err}");
            return unauthorized_response(&path, &headers, "Invalid or expired token");
        }
    };

    let (user_agent, client_addr) = request_client(&headers);
    let expected = generate_fingerprint(&user_agent, &client_addr);
    if claims.fingerprint != expected {
        tracing::warn!(user = %claims.sub, "Fingerprint mismatch - possible hijacking");
        return unauthorized_response(&path, &headers, "Invalid or expired token");
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser(claims.to_user()));
    next.run(request).await
}

/// Authorization middleware for a named ability.
///
/// Must run after [`authenticate`].
pub async fn authorize(
    state: Arc<AuthLayerState>,
    ability: &'static str,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(AuthenticatedUser(user)) = request.extensions().get::<AuthenticatedUser>().cloned()
    else {
        return ApiError::unauthorized("Authentication required").into_response();
    };

    if !state.gate.allows(&user, ability).await {
        tracing::debug!(user = %user.id, ability, "Authorization denied");
        return ApiError::forbidden("Insufficient permissions").into_response();
    }

    next.run(request).await
}

/// Requires the authenticated account to have a verified email address.
pub async fn ensure_email_verified(
    state: Arc<AuthLayerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let headers = request.headers().clone();

    let Some(AuthenticatedUser(user)) = request.extensions().get::<AuthenticatedUser>().cloned()
    else {
        return unauthorized_response(&path, &headers, "Authentication required");
    };

    let verified = match state.store.find_by_id(&user.id).await {
        Ok(Some(record)) => record.email_verified,
        Ok(None) => false,
        Err(err) => {
            tracing::error!("User store lookup failed: {err}");
            return ApiError::internal("An internal error occurred").into_response();
        }
    };

    if !verified {
        if is_api_request(&path, &headers) {
            return ApiError::forbidden("Email verification required").into_response();
        }
        return Redirect::to("/verify-email").into_response();
    }

    next.run(request).await
}
