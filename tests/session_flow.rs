//! Session Lifecycle Tests
//!
//! End-to-end exercises of token issuance, validation, refresh, hijack
//! rejection and revocation through the public crate surface.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use keygate::session::artifacts;
use keygate::{
    generate_fingerprint, AccessClaims, AuthConfig, AuthManager, AuthRuntime, ClientInfo,
    ConfigSecretProvider, Credentials, GuardError, InMemoryUserStore, RefreshClaims,
    RequestContext, RevocationStore, SessionError, SessionOptions, SessionService, TokenCodec,
    UserRecord,
};

const SECRET: &str = "integration-test-secret-key";

fn test_config() -> AuthConfig {
    AuthConfig {
        secret: SECRET.to_string(),
        ..AuthConfig::default()
    }
}

fn test_service() -> SessionService {
    let codec = TokenCodec::new(&ConfigSecretProvider::new(SECRET)).unwrap();
    SessionService::new(Arc::new(codec), test_config())
}

fn test_service_with_revocation(store: Arc<RevocationStore>) -> SessionService {
    test_service().with_revocation(store)
}

fn alice() -> UserRecord {
    UserRecord {
        id: "u-alice".to_string(),
        email: "alice@example.com".to_string(),
        name: "Alice".to_string(),
        role: Some("member".to_string()),
        permissions: vec!["posts.read".to_string()],
        password_hash: "$argon2id$stub".to_string(),
        email_verified: true,
        is_active: true,
    }
}

fn browser() -> ClientInfo {
    ClientInfo::new("Mozilla/5.0 (Test)", "203.0.113.7")
}

fn other_device() -> ClientInfo {
    ClientInfo::new("curl/8.0", "198.51.100.9")
}

fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

/// Build a jar whose access token was issued `age_secs` ago, with a
/// matching refresh artifact from the same login.
fn jar_with_aged_session(service: &SessionService, age_secs: u64) -> (CookieJar, String) {
    let config = service.config().clone();
    let fingerprint = generate_fingerprint(&browser().user_agent, &browser().client_addr);
    let session_id = uuid::Uuid::new_v4().to_string();
    let iat = now() - age_secs;

    let access = AccessClaims::new(
        &keygate::User::from(&alice()),
        &fingerprint,
        &session_id,
        iat,
        config.access_token_ttl_secs,
    );
    let refresh = RefreshClaims::new(
        &alice().id,
        &fingerprint,
        false,
        &session_id,
        iat,
        config.refresh_ttl_secs(false),
    );

    let access_token = service.codec().sign_access(&access).unwrap();
    let refresh_token = service.codec().sign_refresh(&refresh).unwrap();

    let jar = CookieJar::new()
        .add(artifacts::access_cookie(&config, access_token))
        .add(artifacts::refresh_cookie(&config, refresh_token, false))
        .add(artifacts::session_cookie(&config, session_id.clone()))
        .add(artifacts::fingerprint_cookie(&config, fingerprint));

    (jar, session_id)
}

#[tokio::test]
async fn login_then_validate_round_trip() {
    let service = test_service();
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };

    let (created, jar) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    assert_eq!(created.expires_in, 900);
    assert!(jar.get("access_token").is_some());
    assert!(jar.get("refresh_token").is_some());
    assert!(jar.get("session_id").is_some());
    assert!(jar.get("fingerprint").is_some());

    let validation = service.validate_session(&jar, &browser()).await;
    assert!(validation.valid);
    assert!(!validation.needs_refresh);
    let user = validation.user.unwrap();
    assert_eq!(user.id, "u-alice");
    assert_eq!(user.email, "alice@example.com");
}

#[tokio::test]
async fn token_lifetimes_follow_remember_me() {
    let service = test_service();
    let user = keygate::User::from(&alice());

    let short = service.issue_tokens(&user, "fp", false).unwrap();
    let long = service.issue_tokens(&user, "fp", true).unwrap();

    let short_refresh = service.codec().verify_refresh(&short.refresh_token).unwrap();
    let long_refresh = service.codec().verify_refresh(&long.refresh_token).unwrap();

    assert_eq!(short_refresh.exp - short_refresh.iat, 7 * 24 * 3600);
    assert_eq!(long_refresh.exp - long_refresh.iat, 30 * 24 * 3600);
    assert!(long_refresh.remember_me);

    let access = service.codec().verify_access(&short.access_token).unwrap();
    assert_eq!(access.exp - access.iat, 900);
}

// Scenario: a session idle for nine minutes is still comfortably valid,
// while one idle for eleven minutes crosses the five-minute refresh
// threshold of a fifteen-minute token.
#[tokio::test]
async fn refresh_threshold_boundary() {
    let service = test_service();

    let (jar, _) = jar_with_aged_session(&service, 9 * 60);
    let validation = service.validate_session(&jar, &browser()).await;
    assert!(validation.valid);
    assert!(!validation.needs_refresh);

    let (jar, _) = jar_with_aged_session(&service, 11 * 60);
    let validation = service.validate_session(&jar, &browser()).await;
    assert!(validation.valid);
    assert!(validation.needs_refresh);
}

#[tokio::test]
async fn expired_access_token_rejected() {
    let service = test_service();
    let (jar, _) = jar_with_aged_session(&service, 16 * 60);

    let validation = service.validate_session(&jar, &browser()).await;
    assert!(!validation.valid);
    assert_eq!(validation.error, Some(SessionError::ExpiredToken));
}

// Scenario: the full artifact set is captured and replayed from another
// device. Both the original token and the replay carry the original
// fingerprint, which no longer matches the presenting client.
#[tokio::test]
async fn stolen_artifacts_rejected_on_other_device() {
    let service = test_service();
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };
    let (_, jar) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    let validation = service.validate_session(&jar, &other_device()).await;
    assert!(!validation.valid);
    assert_eq!(validation.error, Some(SessionError::FingerprintMismatch));

    let (outcome, _) = service.refresh_session(jar, &other_device()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(SessionError::FingerprintMismatch));
}

// The recomputed fingerprint is authoritative; the fingerprint cookie is
// a consistency check, not a required artifact.
#[tokio::test]
async fn validation_tolerates_missing_fingerprint_artifact() {
    let service = test_service();
    let (jar, _) = jar_with_aged_session(&service, 60);

    let config = service.config().clone();
    let without_fp = CookieJar::new().add(artifacts::access_cookie(
        &config,
        artifacts::read_access_token(&jar).unwrap(),
    ));

    let validation = service.validate_session(&without_fp, &browser()).await;
    assert!(validation.valid);

    // Still rejected when the presenting client differs
    let validation = service.validate_session(&without_fp, &other_device()).await;
    assert_eq!(validation.error, Some(SessionError::FingerprintMismatch));
}

#[tokio::test]
async fn fingerprint_mismatch_wins_over_expiry() {
    let service = test_service();
    let (jar, _) = jar_with_aged_session(&service, 16 * 60);

    let validation = service.validate_session(&jar, &other_device()).await;
    assert_eq!(validation.error, Some(SessionError::FingerprintMismatch));
}

#[tokio::test]
async fn tampered_token_rejected() {
    let service = test_service();
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };
    let (created, _) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    let mut tampered = created.access_token.clone();
    tampered.pop();
    tampered.push('x');

    let config = service.config().clone();
    let jar = CookieJar::new().add(artifacts::access_cookie(&config, tampered));
    let validation = service.validate_session(&jar, &browser()).await;
    assert!(!validation.valid);
    assert!(matches!(
        validation.error,
        Some(SessionError::InvalidSignature) | Some(SessionError::MalformedToken)
    ));
}

#[tokio::test]
async fn token_signed_with_other_key_rejected() {
    let service = test_service();
    let foreign_codec = TokenCodec::new(&ConfigSecretProvider::new("some-other-secret")).unwrap();

    let fingerprint = generate_fingerprint(&browser().user_agent, &browser().client_addr);
    let claims = AccessClaims::new(
        &keygate::User::from(&alice()),
        &fingerprint,
        "sess-1",
        now(),
        900,
    );
    let token = foreign_codec.sign_access(&claims).unwrap();

    let config = service.config().clone();
    let jar = CookieJar::new().add(artifacts::access_cookie(&config, token));
    let validation = service.validate_session(&jar, &browser()).await;
    assert_eq!(validation.error, Some(SessionError::InvalidSignature));
}

#[tokio::test]
async fn refresh_issues_strictly_later_expiry() {
    let service = test_service();
    let (jar, session_id) = jar_with_aged_session(&service, 11 * 60);

    let old_access = artifacts::read_access_token(&jar).unwrap();
    let old_claims = service.codec().verify_access(&old_access).unwrap();

    let (outcome, jar) = service.refresh_session(jar, &browser()).await;
    assert!(outcome.success, "refresh failed: {:?}", outcome.error);

    let new_access = artifacts::read_access_token(&jar).unwrap();
    assert_ne!(new_access, old_access);

    let new_claims = service.codec().verify_access(&new_access).unwrap();
    assert!(new_claims.exp > old_claims.exp);
    assert_eq!(new_claims.jti, session_id);
    assert_eq!(new_claims.sub, "u-alice");

    // Refresh artifact is left untouched
    let refresh = service
        .codec()
        .verify_refresh(&artifacts::read_refresh_token(&jar).unwrap())
        .unwrap();
    assert_eq!(refresh.jti, session_id);
}

#[tokio::test]
async fn refresh_works_after_access_expiry() {
    let service = test_service();
    let (jar, _) = jar_with_aged_session(&service, 16 * 60);

    let validation = service.validate_session(&jar, &browser()).await;
    assert_eq!(validation.error, Some(SessionError::ExpiredToken));

    let (outcome, jar) = service.refresh_session(jar, &browser()).await;
    assert!(outcome.success);

    let validation = service.validate_session(&jar, &browser()).await;
    assert!(validation.valid);
}

#[tokio::test]
async fn refresh_rejects_access_token_in_refresh_slot() {
    let service = test_service();
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };
    let (created, _) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    let config = service.config().clone();
    let jar = CookieJar::new().add(artifacts::refresh_cookie(
        &config,
        created.access_token,
        false,
    ));

    let (outcome, _) = service.refresh_session(jar, &browser()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(SessionError::NotRefreshToken));
}

// Refresh carries identity forward from the co-issued access artifact, so
// a jar holding only the refresh cookie cannot mint a new access token.
#[tokio::test]
async fn refresh_requires_the_paired_access_artifact() {
    let service = test_service();
    let (jar, _) = jar_with_aged_session(&service, 60);

    let config = service.config().clone();
    let refresh_only = CookieJar::new().add(artifacts::refresh_cookie(
        &config,
        artifacts::read_refresh_token(&jar).unwrap(),
        false,
    ));

    let (outcome, _) = service.refresh_session(refresh_only, &browser()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(SessionError::MissingToken));
}

#[tokio::test]
async fn refresh_without_artifacts_fails() {
    let service = test_service();
    let (outcome, _) = service.refresh_session(CookieJar::new(), &browser()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(SessionError::MissingToken));
}

// Scenario: logout deletes the artifacts, but a token captured before
// logout stays cryptographically valid until expiry when no revocation
// store is configured.
#[tokio::test]
async fn destroyed_session_token_still_verifies_without_revocation() {
    let service = test_service();
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };
    let (created, jar) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    let jar = service.destroy_session(jar).await;
    assert!(jar.get("access_token").is_none());

    // Replay the captured token in a fresh jar
    let config = service.config().clone();
    let replay = CookieJar::new().add(artifacts::access_cookie(&config, created.access_token));
    let validation = service.validate_session(&replay, &browser()).await;
    assert!(validation.valid);
}

#[tokio::test]
async fn destroyed_session_token_rejected_with_revocation() {
    let revocation = Arc::new(RevocationStore::new());
    let service = test_service_with_revocation(revocation);
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };
    let (created, jar) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    let _ = service.destroy_session(jar).await;

    let config = service.config().clone();
    let replay = CookieJar::new().add(artifacts::access_cookie(&config, created.access_token));
    let validation = service.validate_session(&replay, &browser()).await;
    assert!(!validation.valid);
    assert_eq!(validation.error, Some(SessionError::Revoked));
}

#[tokio::test]
async fn invalidate_all_supersedes_earlier_sessions() {
    let revocation = Arc::new(RevocationStore::new());
    let service = test_service_with_revocation(revocation);

    // Issue a session stamped one minute in the past so the watermark set
    // at "now" supersedes it.
    let (jar, _) = jar_with_aged_session(&service, 60);

    service.invalidate_all_user_sessions("u-alice").await.unwrap();

    let validation = service.validate_session(&jar, &browser()).await;
    assert!(!validation.valid);
    assert_eq!(validation.error, Some(SessionError::Revoked));

    let (outcome, _) = service.refresh_session(jar, &browser()).await;
    assert_eq!(outcome.error, Some(SessionError::Revoked));
}

// A login racing a logout-everywhere in the same second must not survive
// the invalidation.
#[tokio::test]
async fn invalidation_supersedes_token_issued_at_the_same_instant() {
    let revocation = Arc::new(RevocationStore::new());
    let service = test_service_with_revocation(revocation.clone());
    let (jar, _) = jar_with_aged_session(&service, 0);

    let iat = service
        .codec()
        .verify_access(&artifacts::read_access_token(&jar).unwrap())
        .unwrap()
        .iat;
    revocation.invalidate_user("u-alice", iat).await;

    let validation = service.validate_session(&jar, &browser()).await;
    assert!(!validation.valid);
    assert_eq!(validation.error, Some(SessionError::Revoked));
}

#[tokio::test]
async fn invalidate_all_without_store_is_an_explicit_error() {
    let service = test_service();
    assert_eq!(
        service.invalidate_all_user_sessions("u-alice").await,
        Err(SessionError::RevocationUnavailable)
    );
    assert_eq!(
        service.get_user_sessions("u-alice").await,
        Err(SessionError::EnumerationUnavailable)
    );
}

#[tokio::test]
async fn regenerate_issues_new_session_for_same_user() {
    let service = test_service();
    let opts = SessionOptions {
        remember_me: false,
        client: browser(),
    };
    let (first, jar) = service
        .create_session(&alice(), &opts, CookieJar::new())
        .await
        .unwrap();

    let (second, jar) = service
        .regenerate_session(jar, &browser(), &alice())
        .await
        .unwrap();

    assert_ne!(first.session_id, second.session_id);
    let validation = service.validate_session(&jar, &browser()).await;
    assert!(validation.valid);
}

#[tokio::test]
async fn empty_secret_fails_closed() {
    let result = TokenCodec::new(&ConfigSecretProvider::new(""));
    assert!(result.is_err());
}

// Scenario: an unregistered guard name is a programmer error, not a
// silent fallback to the default guard.
#[tokio::test]
async fn unknown_guard_name_errors() {
    let service = Arc::new(test_service());
    let runtime = AuthRuntime::new(
        service,
        Arc::new(InMemoryUserStore::new()),
        Arc::new(keygate::Argon2Hasher),
    );

    let context = RequestContext::new(browser());
    let mut manager = AuthManager::for_request(&runtime, context, CookieJar::new(), None);

    assert!(manager.guard(Some("session")).is_ok());
    assert!(manager.guard(Some("api")).is_ok());
    assert_eq!(
        manager.guard(Some("oauth")).err(),
        Some(GuardError::UnknownGuard("oauth".to_string()))
    );
}

#[tokio::test]
async fn credential_attempt_through_default_guard() {
    let hasher = keygate::Argon2Hasher;
    let mut record = alice();
    record.password_hash =
        keygate::PasswordHasher::hash(&hasher, "correct horse battery").unwrap();

    let store = Arc::new(InMemoryUserStore::new());
    store.insert(record).await;

    let runtime = AuthRuntime::new(Arc::new(test_service()), store, Arc::new(hasher));
    let context = RequestContext::new(browser());
    let mut manager = AuthManager::for_request(&runtime, context, CookieJar::new(), None);

    let bad = Credentials {
        email: "alice@example.com".to_string(),
        password: "wrong".to_string(),
    };
    assert!(!manager.attempt(&bad, false).await.unwrap());

    let good = Credentials {
        email: "alice@example.com".to_string(),
        password: "correct horse battery".to_string(),
    };
    assert!(manager.attempt(&good, false).await.unwrap());
    assert!(manager.check().await.unwrap());
    assert_eq!(manager.id().await.unwrap(), Some("u-alice".to_string()));
}
