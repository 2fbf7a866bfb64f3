//! Session lifecycle orchestration.
//!
//! A session moves through `None -> Active -> (Refreshing) -> Active ->
//! Destroyed`. Creation writes the four client-held artifacts; validation
//! and refresh read them back; destruction clears them. Normal failures are
//! returned as structured outcomes, never as errors, so routine denials stay
//! free of stack traces.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::context::ClientInfo;
use crate::session::artifacts;
use crate::session::revocation::RevocationStore;
use crate::store::{User, UserRecord};
use crate::token::{generate_fingerprint, AccessClaims, RefreshClaims, TokenCodec, TokenError};

/// Session-level errors, reported inside structured outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No usable session artifacts are present.
    #[error("missing session token")]
    MissingToken,

    /// The token has expired.
    #[error("session token has expired")]
    ExpiredToken,

    /// The token signature is invalid.
    #[error("session token signature is invalid")]
    InvalidSignature,

    /// The token is structurally invalid.
    #[error("session token is malformed")]
    MalformedToken,

    /// The token's fingerprint does not match this client. Treated as a
    /// possible-hijacking signal: callers should force re-authentication,
    /// never silently refresh.
    #[error("fingerprint mismatch - possible hijacking")]
    FingerprintMismatch,

    /// A refresh was attempted with a token that is not a refresh token.
    #[error("token is not a refresh token")]
    NotRefreshToken,

    /// The session has been revoked server-side.
    #[error("session has been revoked")]
    Revoked,

    /// Server-side revocation was requested but no revocation store is
    /// configured.
    #[error("revocation store is not configured")]
    RevocationUnavailable,

    /// Session enumeration requires per-session server-side bookkeeping,
    /// which this core does not carry.
    #[error("session enumeration is not implemented")]
    EnumerationUnavailable,

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    SigningFailed(String),
}

impl From<TokenError> for SessionError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => SessionError::ExpiredToken,
            TokenError::InvalidSignature => SessionError::InvalidSignature,
            TokenError::Malformed | TokenError::WrongTokenType => SessionError::MalformedToken,
            TokenError::MissingSecret => {
                SessionError::SigningFailed("signing secret is not configured".to_string())
            }
            TokenError::SigningFailed(msg) => SessionError::SigningFailed(msg),
        }
    }
}

/// Options for creating a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Remember-me: selects the refresh token's lifetime class.
    pub remember_me: bool,
    /// Client characteristics the session is bound to.
    pub client: ClientInfo,
}

/// Tokens and identifiers produced by a successful login.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    /// Session id, shared as `jti` by both tokens.
    pub session_id: String,
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token.
    pub refresh_token: String,
    /// Fingerprint both tokens are bound to.
    pub fingerprint: String,
    /// Remember-me flag baked into the refresh token.
    pub remember_me: bool,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Result of validating the current session.
#[derive(Debug, Clone)]
pub struct SessionValidation {
    /// Whether the session is valid.
    pub valid: bool,
    /// The authenticated user, when valid.
    pub user: Option<User>,
    /// Set when the access token is inside the refresh threshold.
    pub needs_refresh: bool,
    /// Why validation failed, when invalid.
    pub error: Option<SessionError>,
}

impl SessionValidation {
    fn ok(user: User, needs_refresh: bool) -> Self {
        Self {
            valid: true,
            user: Some(user),
            needs_refresh,
            error: None,
        }
    }

    fn rejected(error: SessionError) -> Self {
        Self {
            valid: false,
            user: None,
            needs_refresh: false,
            error: Some(error),
        }
    }
}

/// Result of a refresh attempt.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Whether a new access token was issued.
    pub success: bool,
    /// The new access token, on success.
    pub access_token: Option<String>,
    /// Why the refresh failed, on failure.
    pub error: Option<SessionError>,
}

impl RefreshOutcome {
    fn ok(access_token: String) -> Self {
        Self {
            success: true,
            access_token: Some(access_token),
            error: None,
        }
    }

    fn rejected(error: SessionError) -> Self {
        Self {
            success: false,
            access_token: None,
            error: Some(error),
        }
    }
}

/// Orchestrates session creation, validation, refresh and destruction.
///
/// Stateless by default: all session state lives in the client-held
/// artifacts. An optional [`RevocationStore`] adds server-side denial.
pub struct SessionService {
    codec: Arc<TokenCodec>,
    config: AuthConfig,
    revocation: Option<Arc<RevocationStore>>,
}

impl SessionService {
    /// Create a session service.
    pub fn new(codec: Arc<TokenCodec>, config: AuthConfig) -> Self {
        Self {
            codec,
            config,
            revocation: None,
        }
    }

    /// Attach a revocation store, consulted on every validate and refresh.
    pub fn with_revocation(mut self, store: Arc<RevocationStore>) -> Self {
        self.revocation = Some(store);
        self
    }

    /// The token codec this service signs with.
    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// The auth configuration this service was built with.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    /// Sign a fresh token pair for a user without touching any artifacts.
    ///
    /// Used by session creation and by bearer-token logins that return
    /// tokens in the response body instead of cookies.
    pub fn issue_tokens(
        &self,
        user: &User,
        fingerprint: &str,
        remember_me: bool,
    ) -> Result<CreatedSession, SessionError> {
        let session_id = Uuid::new_v4().to_string();
        let now = Self::now();

        let access_claims = AccessClaims::new(
            user,
            fingerprint,
            &session_id,
            now,
            self.config.access_token_ttl_secs,
        );
        let refresh_claims = RefreshClaims::new(
            &user.id,
            fingerprint,
            remember_me,
            &session_id,
            now,
            self.config.refresh_ttl_secs(remember_me),
        );

        let access_token = self.codec.sign_access(&access_claims)?;
        let refresh_token = self.codec.sign_refresh(&refresh_claims)?;

        Ok(CreatedSession {
            session_id,
            access_token,
            refresh_token,
            fingerprint: fingerprint.to_string(),
            remember_me,
            expires_in: self.config.access_token_ttl_secs,
        })
    }

    /// Create a session for a user and write all four client artifacts.
    pub async fn create_session(
        &self,
        user: &UserRecord,
        opts: &SessionOptions,
        jar: CookieJar,
    ) -> Result<(CreatedSession, CookieJar), SessionError> {
        let fingerprint =
            generate_fingerprint(&opts.client.user_agent, &opts.client.client_addr);
        let created = self.issue_tokens(&User::from(user), &fingerprint, opts.remember_me)?;

        let jar = jar
            .add(artifacts::access_cookie(
                &self.config,
                created.access_token.clone(),
            ))
            .add(artifacts::refresh_cookie(
                &self.config,
                created.refresh_token.clone(),
                created.remember_me,
            ))
            .add(artifacts::session_cookie(
                &self.config,
                created.session_id.clone(),
            ))
            .add(artifacts::fingerprint_cookie(
                &self.config,
                created.fingerprint.clone(),
            ));

        info!(
            user_id = %user.id,
            session_id = %created.session_id,
            remember_me = opts.remember_me,
            "Session created"
        );

        Ok((created, jar))
    }

    /// Validate the current session from its artifacts.
    ///
    /// A fingerprint mismatch rejects unconditionally, regardless of
    /// remaining token lifetime. The fingerprint recomputed from the
    /// presenting client is the authoritative check; the stored fingerprint
    /// artifact is cross-checked only when present, so a jar carrying just
    /// the access artifact still validates. `needs_refresh` is set when the
    /// access token is within the refresh threshold of its expiry.
    pub async fn validate_session(&self, jar: &CookieJar, client: &ClientInfo) -> SessionValidation {
        let token = match artifacts::read_access_token(jar) {
            Some(t) => t,
            None => return SessionValidation::rejected(SessionError::MissingToken),
        };

        // Signature first; expiry is checked after the fingerprint so a
        // hijack signal is never masked by an expired token.
        let claims = match self.codec.verify_access_allow_expired(&token) {
            Ok(c) => c,
            Err(e) => return SessionValidation::rejected(e.into()),
        };

        let expected = generate_fingerprint(&client.user_agent, &client.client_addr);
        if claims.fingerprint != expected {
            warn!(
                session_id = %claims.jti,
                "Fingerprint mismatch on validation: possible hijacking"
            );
            return SessionValidation::rejected(SessionError::FingerprintMismatch);
        }
        if let Some(stored) = artifacts::read_fingerprint(jar) {
            if stored != claims.fingerprint {
                warn!(
                    session_id = %claims.jti,
                    "Stored fingerprint artifact does not match token: possible hijacking"
                );
                return SessionValidation::rejected(SessionError::FingerprintMismatch);
            }
        }

        if let Some(store) = &self.revocation {
            if store.is_revoked(&claims.jti).await
                || store.is_superseded(&claims.sub, claims.iat).await
            {
                return SessionValidation::rejected(SessionError::Revoked);
            }
        }

        let now = Self::now();
        if claims.exp <= now {
            return SessionValidation::rejected(SessionError::ExpiredToken);
        }

        let needs_refresh = claims.exp - now < self.config.refresh_threshold_secs;
        SessionValidation::ok(claims.to_user(), needs_refresh)
    }

    /// Refresh the access token using the refresh artifact.
    ///
    /// Trusts the refresh token's claims as-is: the user store is not
    /// consulted. The refresh token itself is not rotated, so a captured
    /// refresh token stays replayable until natural expiry and two
    /// concurrent refreshes both succeed; [`RevocationStore::revoke`] is the
    /// hook a rotate-on-use scheme would build on. Only the access artifact
    /// is overwritten.
    pub async fn refresh_session(
        &self,
        jar: CookieJar,
        client: &ClientInfo,
    ) -> (RefreshOutcome, CookieJar) {
        let token = match artifacts::read_refresh_token(&jar) {
            Some(t) => t,
            None => return (RefreshOutcome::rejected(SessionError::MissingToken), jar),
        };

        let refresh_claims = match self.codec.verify_refresh(&token) {
            Ok(c) => c,
            Err(TokenError::WrongTokenType) => {
                return (
                    RefreshOutcome::rejected(SessionError::NotRefreshToken),
                    jar,
                )
            }
            Err(e) => return (RefreshOutcome::rejected(e.into()), jar),
        };

        let expected = generate_fingerprint(&client.user_agent, &client.client_addr);
        if refresh_claims.fingerprint != expected {
            warn!(
                session_id = %refresh_claims.jti,
                "Fingerprint mismatch on refresh: possible hijacking"
            );
            return (
                RefreshOutcome::rejected(SessionError::FingerprintMismatch),
                jar,
            );
        }

        if let Some(store) = &self.revocation {
            if store.is_revoked(&refresh_claims.jti).await
                || store
                    .is_superseded(&refresh_claims.sub, refresh_claims.iat)
                    .await
            {
                return (RefreshOutcome::rejected(SessionError::Revoked), jar);
            }
        }

        // Identity claims come from the expiring access artifact; both were
        // written together at login. A partially cleared artifact set fails
        // here and forces re-authentication.
        let identity = match artifacts::read_access_token(&jar)
            .and_then(|t| self.codec.verify_access_allow_expired(&t).ok())
        {
            Some(c) if c.jti == refresh_claims.jti => c,
            _ => return (RefreshOutcome::rejected(SessionError::MissingToken), jar),
        };

        let now = Self::now();
        let access_claims = AccessClaims::new(
            &identity.to_user(),
            &refresh_claims.fingerprint,
            &refresh_claims.jti,
            now,
            self.config.access_token_ttl_secs,
        );
        let access_token = match self.codec.sign_access(&access_claims) {
            Ok(t) => t,
            Err(e) => return (RefreshOutcome::rejected(e.into()), jar),
        };

        let jar = jar.add(artifacts::access_cookie(&self.config, access_token.clone()));

        info!(
            user_id = %refresh_claims.sub,
            session_id = %refresh_claims.jti,
            remember_me = refresh_claims.remember_me,
            "Access token refreshed"
        );

        (RefreshOutcome::ok(access_token), jar)
    }

    /// Re-validate the current session, then create a fresh one for the same
    /// user (used after privilege changes).
    ///
    /// The superseded tokens are not invalidated: if retained elsewhere they
    /// stay independently valid until they expire, unless a revocation store
    /// is consulted at validation time.
    pub async fn regenerate_session(
        &self,
        jar: CookieJar,
        client: &ClientInfo,
        user: &UserRecord,
    ) -> Result<(CreatedSession, CookieJar), SessionError> {
        let validation = self.validate_session(&jar, client).await;
        if !validation.valid {
            return Err(validation.error.unwrap_or(SessionError::MissingToken));
        }

        let remember_me = artifacts::read_refresh_token(&jar)
            .and_then(|t| self.codec.verify_refresh(&t).ok())
            .map(|c| c.remember_me)
            .unwrap_or(false);

        let opts = SessionOptions {
            remember_me,
            client: client.clone(),
        };
        self.create_session(user, &opts, jar).await
    }

    /// Destroy the current session by deleting all four client artifacts.
    ///
    /// Without a revocation store this provides no server-side revocation: a
    /// previously captured, still-unexpired access token remains
    /// cryptographically valid if presented directly. With a store, the
    /// session family's `jti` is revoked as well.
    pub async fn destroy_session(&self, jar: CookieJar) -> CookieJar {
        if let Some(store) = &self.revocation {
            if let Some(claims) = artifacts::read_access_token(&jar)
                .and_then(|t| self.codec.verify_access_allow_expired(&t).ok())
            {
                store.revoke(&claims.jti, claims.exp).await;
            }
        }

        if let Some(session_id) = artifacts::read_session_id(&jar) {
            info!(session_id = %session_id, "Session destroyed");
        }

        artifacts::clear_all(jar, &self.config)
    }

    /// Invalidate every session of a user (password change, logout
    /// everywhere).
    ///
    /// Requires a revocation store; without one this fails explicitly rather
    /// than appearing to succeed.
    pub async fn invalidate_all_user_sessions(&self, user_id: &str) -> Result<(), SessionError> {
        match &self.revocation {
            Some(store) => {
                store.invalidate_user(user_id, Self::now()).await;
                Ok(())
            }
            None => Err(SessionError::RevocationUnavailable),
        }
    }

    /// Enumerate a user's active sessions.
    ///
    /// Enumeration needs per-session server-side bookkeeping that this core
    /// does not carry (the revocation store only tracks denials). Fails
    /// explicitly; it never no-ops as an empty success.
    pub async fn get_user_sessions(&self, _user_id: &str) -> Result<Vec<String>, SessionError> {
        Err(SessionError::EnumerationUnavailable)
    }
}
