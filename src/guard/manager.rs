//! Guard registry and facade.

use std::collections::HashMap;
use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use tokio::sync::Mutex;

use crate::context::RequestContext;
use crate::guard::limiter::LoginLimiter;
use crate::guard::{Credentials, Guard, GuardError, SessionGuard, TokenGuard};
use crate::password::PasswordHasher;
use crate::session::{SessionError, SessionService};
use crate::store::{User, UserRecord, UserStore};

/// Name of the cookie-backed guard.
pub const SESSION_GUARD: &str = "session";

/// Name of the bearer-token guard.
pub const TOKEN_GUARD: &str = "api";

/// Process-wide, immutable dependencies the guards are built from.
///
/// This is the only thing shared across requests; the managers and guards
/// themselves are constructed fresh per request.
#[derive(Clone)]
pub struct AuthRuntime {
    /// Session orchestration service.
    pub service: Arc<SessionService>,
    /// External user store.
    pub store: Arc<dyn UserStore>,
    /// External password hasher.
    pub hasher: Arc<dyn PasswordHasher>,
    /// Shared login attempt limiter.
    pub limiter: Arc<Mutex<LoginLimiter>>,
}

impl AuthRuntime {
    /// Bundle the auth dependencies.
    pub fn new(
        service: Arc<SessionService>,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            service,
            store,
            hasher,
            limiter: Arc::new(Mutex::new(LoginLimiter::new())),
        }
    }
}

/// Name-keyed registry of guards with a configurable default.
///
/// One manager serves exactly one request; the facade methods delegate to
/// the default guard.
pub struct AuthManager {
    guards: HashMap<String, Guard>,
    default_guard: String,
}

impl AuthManager {
    /// Build the default registry (`"session"` and `"api"`) for one inbound
    /// request.
    pub fn for_request(
        runtime: &AuthRuntime,
        context: RequestContext,
        jar: CookieJar,
        bearer: Option<String>,
    ) -> Self {
        let mut guards = HashMap::new();
        guards.insert(
            SESSION_GUARD.to_string(),
            Guard::Session(SessionGuard::new(
                runtime.service.clone(),
                runtime.store.clone(),
                runtime.hasher.clone(),
                runtime.limiter.clone(),
                context.clone(),
                jar,
            )),
        );
        guards.insert(
            TOKEN_GUARD.to_string(),
            Guard::Token(TokenGuard::new(
                runtime.service.clone(),
                runtime.store.clone(),
                runtime.hasher.clone(),
                context,
                bearer,
            )),
        );

        Self {
            guards,
            default_guard: runtime.service.config().default_guard.clone(),
        }
    }

    /// Resolve a guard by name, or the default guard when `name` is `None`.
    ///
    /// An unregistered name is a programmer error, reported as
    /// [`GuardError::UnknownGuard`].
    pub fn guard(&mut self, name: Option<&str>) -> Result<&mut Guard, GuardError> {
        let name = name.unwrap_or(&self.default_guard).to_string();
        self.guards
            .get_mut(&name)
            .ok_or(GuardError::UnknownGuard(name))
    }

    /// Register a custom guard under a name, replacing any existing one.
    pub fn extend(&mut self, name: impl Into<String>, guard: Guard) {
        self.guards.insert(name.into(), guard);
    }

    /// Change the default guard name.
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_guard = name.into();
    }

    /// The default guard's name.
    pub fn default_guard_name(&self) -> &str {
        &self.default_guard
    }

    /// Current user via the default guard.
    pub async fn user(&mut self) -> Result<Option<User>, GuardError> {
        Ok(self.guard(None)?.user().await)
    }

    /// Whether the default guard has an authenticated user.
    pub async fn check(&mut self) -> Result<bool, GuardError> {
        Ok(self.guard(None)?.check().await)
    }

    /// Whether the default guard sees a guest.
    pub async fn guest(&mut self) -> Result<bool, GuardError> {
        Ok(self.guard(None)?.guest().await)
    }

    /// Current user id via the default guard.
    pub async fn id(&mut self) -> Result<Option<String>, GuardError> {
        Ok(self.guard(None)?.id().await)
    }

    /// Validate credentials via the default guard.
    pub async fn validate(&mut self, credentials: &Credentials) -> Result<bool, GuardError> {
        Ok(self.guard(None)?.validate(credentials).await)
    }

    /// Attempt a login via the default guard.
    pub async fn attempt(
        &mut self,
        credentials: &Credentials,
        remember: bool,
    ) -> Result<bool, GuardError> {
        Ok(self.guard(None)?.attempt(credentials, remember).await)
    }

    /// Log a user in via the default guard.
    pub async fn login(
        &mut self,
        user: &UserRecord,
        remember: bool,
    ) -> Result<Result<(), SessionError>, GuardError> {
        Ok(self.guard(None)?.login(user, remember).await)
    }

    /// Log in by user id via the default guard.
    pub async fn login_using_id(
        &mut self,
        id: &str,
        remember: bool,
    ) -> Result<Option<User>, GuardError> {
        Ok(self.guard(None)?.login_using_id(id, remember).await)
    }

    /// Log out via the default guard.
    pub async fn logout(&mut self) -> Result<(), GuardError> {
        self.guard(None)?.logout().await;
        Ok(())
    }
}
