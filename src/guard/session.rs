//! Cookie-backed session guard.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::context::RequestContext;
use crate::guard::limiter::{LimitResult, LoginLimiter};
use crate::guard::Credentials;
use crate::password::PasswordHasher;
use crate::session::{SessionError, SessionOptions, SessionService};
use crate::store::{User, UserRecord, UserStore};

/// Authenticates requests through the four session cookies.
///
/// Constructed once per inbound request; the memoized user is scoped to that
/// request. Sharing one guard across concurrent requests would leak one
/// request's identity into another.
pub struct SessionGuard {
    service: Arc<SessionService>,
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    limiter: Arc<Mutex<LoginLimiter>>,
    context: RequestContext,
    jar: CookieJar,
    cached_user: Option<User>,
}

impl SessionGuard {
    /// Create a guard for one request.
    pub fn new(
        service: Arc<SessionService>,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        limiter: Arc<Mutex<LoginLimiter>>,
        context: RequestContext,
        jar: CookieJar,
    ) -> Self {
        Self {
            service,
            store,
            hasher,
            limiter,
            context,
            jar,
            cached_user: None,
        }
    }

    /// The cookie jar including any writes performed by this guard. Apply it
    /// to the response so Set-Cookie headers reach the client.
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Consume the guard, returning its cookie jar.
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }

    /// The per-request context, including the identity slot.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Resolve the current user, memoized for this request.
    ///
    /// Checks the context identity slot first (set earlier in the pipeline),
    /// then validates the session; if the access token is near expiry this
    /// attempts exactly one refresh followed by one re-validation.
    pub async fn user(&mut self) -> Option<User> {
        if let Some(user) = &self.cached_user {
            return Some(user.clone());
        }
        if let Some(user) = self.context.current_user() {
            let user = user.clone();
            self.cached_user = Some(user.clone());
            return Some(user);
        }

        let client = self.context.client().clone();
        let validation = self.service.validate_session(&self.jar, &client).await;
        if !validation.valid {
            return None;
        }

        let mut user = validation.user;
        if validation.needs_refresh {
            let (outcome, jar) = self
                .service
                .refresh_session(self.jar.clone(), &client)
                .await;
            self.jar = jar;
            if outcome.success {
                let revalidation = self.service.validate_session(&self.jar, &client).await;
                if revalidation.valid {
                    user = revalidation.user;
                }
            }
        }

        self.cached_user = user.clone();
        user
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

    /// Check credentials without logging in. Invalid credentials are a
    /// `false`, never an error.
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

    /// Attempt a credential login. On success the session is created and the
    /// identity slot updated.
    pub async fn attempt(&mut self, credentials: &Credentials, remember: bool) -> bool {
        {
            let mut limiter = self.limiter.lock().await;
            if let LimitResult::Locked(remaining) = limiter.check(&credentials.email) {
                warn!(
                    correlation_id = %self.context.correlation_id(),
                    remaining_secs = remaining.as_secs(),
                    "Login attempt blocked: account locked"
                );
                return false;
            }
        }

        let record = match self.store.find_by_email(&credentials.email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.limiter.lock().await.record_failure(&credentials.email);
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

        if !record.is_active {
            warn!(
                user_id = %record.id,
                correlation_id = %self.context.correlation_id(),
                "Login failed: account inactive"
            );
            return false;
        }

        if self
            .hasher
            .verify(&credentials.password, &record.password_hash)
            .is_err()
        {
            self.limiter.lock().await.record_failure(&credentials.email);
            warn!(
                user_id = %record.id,
                correlation_id = %self.context.correlation_id(),
                "Login failed: wrong password"
            );
            return false;
        }

        self.limiter.lock().await.clear(&credentials.email);

        match self.login(&record, remember).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    user_id = %record.id,
                    correlation_id = %self.context.correlation_id(),
                    "Session creation failed after credential check: {e}"
                );
                false
            }
        }
    }

    /// Log a user in, creating a new session.
    pub async fn login(&mut self, user: &UserRecord, remember: bool) -> Result<(), SessionError> {
        let opts = SessionOptions {
            remember_me: remember,
            client: self.context.client().clone(),
        };
        let (created, jar) = self
            .service
            .create_session(user, &opts, self.jar.clone())
            .await?;
        self.jar = jar;

        let projection = User::from(user);
        self.context.set_current_user(projection.clone());
        self.cached_user = Some(projection);

        info!(
            user_id = %user.id,
            session_id = %created.session_id,
            correlation_id = %self.context.correlation_id(),
            "User logged in"
        );
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

    /// Destroy the current session and clear the identity slot.
    pub async fn logout(&mut self) {
        self.jar = self.service.destroy_session(self.jar.clone()).await;
        self.context.clear_current_user();
        self.cached_user = None;

        info!(
            correlation_id = %self.context.correlation_id(),
            "User logged out"
        );
    }
}
