//! Bearer-token guard for stateless API clients.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::context::RequestContext;
use crate::guard::Credentials;
use crate::password::PasswordHasher;
use crate::session::{CreatedSession, SessionError, SessionService};
use crate::store::{User, UserRecord, UserStore};

/// Authenticates requests through an `Authorization: Bearer` token.
///
/// Deliberately has no refresh step of its own: API clients manage their own
/// refresh cadence. Like [`super::SessionGuard`], one instance serves exactly
/// one request.
pub struct TokenGuard {
    service: Arc<SessionService>,
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    context: RequestContext,
    bearer: Option<String>,
    cached_user: Option<User>,
    issued: Option<CreatedSession>,
}

impl TokenGuard {
    /// Create a guard for one request.
    pub fn new(
        service: Arc<SessionService>,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        context: RequestContext,
        bearer: Option<String>,
    ) -> Self {
        Self {
            service,
            store,
            hasher,
            context,
            bearer,
            cached_user: None,
            issued: None,
        }
    }

    /// Tokens minted by `login`/`attempt` on this guard, for the response
    /// body. Bearer clients receive tokens directly instead of cookies.
    pub fn issued_tokens(&self) -> Option<&CreatedSession> {
        self.issued.as_ref()
    }

    /// The per-request context, including the identity slot.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Resolve the current user from the bearer token, memoized for this
    /// request.
    pub async fn user(&mut self) -> Option<User> {
        if let Some(user) = &self.cached_user {
            return Some(user.clone());
        }
        if let Some(user) = self.context.current_user() {
            let user = user.clone();
            self.cached_user = Some(user.clone());
            return Some(user);
        }

        let token = self.bearer.as_deref()?;
        let claims = match self.service.codec().verify_access(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(
                    correlation_id = %self.context.correlation_id(),
                    "Bearer token rejected: {e}"
                );
                return None;
            }
        };

        let client = self.context.client();
        let expected =
            crate::token::generate_fingerprint(&client.user_agent, &client.client_addr);
        if claims.fingerprint != expected {
            warn!(
                session_id = %claims.jti,
                correlation_id = %self.context.correlation_id(),
                "Bearer fingerprint mismatch: possible hijacking"
            );
            return None;
        }

        let user = claims.to_user();
        self.cached_user = Some(user.clone());
        Some(user)
    }

    /// Whether a user is authenticated.
    pub async fn check(&mut self) -> bool {
        self.user().await.is_some()
    }

    /// Whether the request is unauthenticated.
    pub async fn guest(&mut self) -> bool {
        !self.check().await
    }

    /// The current user's id, if any.
    pub async fn id(&mut self) -> Option<String> {
        self.user().await.map(|u| u.id)
    }

    /// Check credentials without logging in.
    pub async fn validate(&mut self, credentials: &Credentials) -> bool {
        let record = match self.store.find_by_email(&credentials.email).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                error!(
                    correlation_id = %self.context.correlation_id(),
                    "User store lookup failed: {e}"
                );
                return false;
            }
        };

        record.is_active
            && self
                .hasher
                .verify(&credentials.password, &record.password_hash)
                .is_ok()
    }

    /// Attempt a credential login, minting a token pair on success.
    pub async fn attempt(&mut self, credentials: &Credentials, remember: bool) -> bool {
        let record = match self.store.find_by_email(&credentials.email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(
                    correlation_id = %self.context.correlation_id(),
                    "Login failed: user not found"
                );
                return false;
            }
            Err(e) => {
                error!(
                    correlation_id = %self.context.correlation_id(),
                    "User store lookup failed: {e}"
                );
                return false;
            }
        };

        if !record.is_active
            || self
                .hasher
                .verify(&credentials.password, &record.password_hash)
                .is_err()
        {
            warn!(
                correlation_id = %self.context.correlation_id(),
                "Login failed: invalid credentials"
            );
            return false;
        }

        self.login(&record, remember).await.is_ok()
    }

    /// Log a user in by minting a token pair for the response body.
    pub async fn login(&mut self, user: &UserRecord, remember: bool) -> Result<(), SessionError> {
        let client = self.context.client();
        let fingerprint =
            crate::token::generate_fingerprint(&client.user_agent, &client.client_addr);
        let created = self
            .service
            .issue_tokens(&User::from(user), &fingerprint, remember)?;

        info!(
            user_id = %user.id,
            session_id = %created.session_id,
            correlation_id = %self.context.correlation_id(),
            "Bearer login"
        );

        let projection = User::from(user);
        self.context.set_current_user(projection.clone());
        self.cached_user = Some(projection);
        self.issued = Some(created);
        Ok(())
    }

    /// Log in a user by id, bypassing the credential check.
    pub async fn login_using_id(&mut self, id: &str, remember: bool) -> Option<User> {
        let record = match self.store.find_by_id(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                error!(
                    correlation_id = %self.context.correlation_id(),
                    "User store lookup failed: {e}"
                );
                return None;
            }
        };

        if !record.is_active {
            return None;
        }

        self.login(&record, remember).await.ok()?;
        Some(User::from(&record))
    }

    /// Clear the request-scoped identity. Stateless tokens cannot be
    /// invalidated here; server-side denial is the revocation store's job.
    pub async fn logout(&mut self) {
        self.context.clear_current_user();
        self.cached_user = None;
        self.issued = None;
    }
}
