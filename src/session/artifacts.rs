//! Client-held session artifacts.
//!
//! A session leaves four cookies on the client: the access token, the refresh
//! token, the session id and the fingerprint. All are HttpOnly; the Secure
//! attribute follows configuration (off only for local development); the
//! refresh cookie is SameSite=Strict and path-scoped to the refresh endpoint
//! while the other three are SameSite=Lax on `/`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::{AccessCookieLifetime, AuthConfig};

/// Access token cookie name.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Refresh token cookie name.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Session id cookie name.
pub const SESSION_ID_COOKIE: &str = "session_id";

/// Fingerprint cookie name.
pub const FINGERPRINT_COOKIE: &str = "fingerprint";

fn lax_cookie(name: &'static str, value: String, config: &AuthConfig, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .build()
}

/// Max-age of the access/session/fingerprint cookies under the configured
/// lifetime policy.
///
/// The long-standing behavior is `AbsoluteWindow`: the cookie outlives the
/// 15-minute token inside it and the refresh flow keeps the session usable.
fn access_profile_max_age(config: &AuthConfig) -> u64 {
    match config.access_cookie_lifetime {
        AccessCookieLifetime::AbsoluteWindow => config.absolute_window_secs(),
        AccessCookieLifetime::TokenLifetime => config.access_token_ttl_secs,
    }
}

/// Build the access token cookie.
pub fn access_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    lax_cookie(ACCESS_TOKEN_COOKIE, token, config, access_profile_max_age(config))
}

/// Build the session id cookie.
pub fn session_cookie(config: &AuthConfig, session_id: String) -> Cookie<'static> {
    lax_cookie(SESSION_ID_COOKIE, session_id, config, access_profile_max_age(config))
}

/// Build the fingerprint cookie.
pub fn fingerprint_cookie(config: &AuthConfig, fingerprint: String) -> Cookie<'static> {
    lax_cookie(FINGERPRINT_COOKIE, fingerprint, config, access_profile_max_age(config))
}

/// Build the refresh token cookie: Strict same-site, scoped to the refresh
/// endpoint, lifetime per the remember-me TTL class.
pub fn refresh_cookie(config: &AuthConfig, token: String, remember_me: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Strict)
        .path(config.refresh_cookie_path.clone())
        .max_age(time::Duration::seconds(
            config.refresh_ttl_secs(remember_me) as i64
        ))
        .build()
}

/// Read the access token artifact.
pub fn read_access_token(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Read the refresh token artifact.
pub fn read_refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Read the session id artifact.
pub fn read_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_ID_COOKIE).map(|c| c.value().to_string())
}

/// Read the fingerprint artifact.
pub fn read_fingerprint(jar: &CookieJar) -> Option<String> {
    jar.get(FINGERPRINT_COOKIE).map(|c| c.value().to_string())
}

/// Remove all four artifacts from the jar.
///
/// Removal cookies must match the path the originals were set with,
/// otherwise browsers keep the original.
pub fn clear_all(jar: CookieJar, config: &AuthConfig) -> CookieJar {
    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/").build());
    let jar = jar.remove(Cookie::build(SESSION_ID_COOKIE).path("/").build());
    let jar = jar.remove(Cookie::build(FINGERPRINT_COOKIE).path("/").build());
    jar.remove(
        Cookie::build(REFRESH_TOKEN_COOKIE)
            .path(config.refresh_cookie_path.clone())
            .build(),
    )
}
