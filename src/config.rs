//! Configuration module for keygate.

use serde::Deserialize;
use std::path::Path;

use crate::{KeygateError, Result};

/// Policy for the access-token cookie's lifetime.
///
/// The access token itself always expires after 15 minutes; the cookie that
/// carries it may outlive the token so the refresh flow can keep the session
/// usable without re-authentication. `AbsoluteWindow` (the default) keeps the
/// cookie alive for the full absolute session window, matching the behavior
/// this subsystem has always had. `TokenLifetime` makes the cookie die with
/// the token inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessCookieLifetime {
    /// Cookie max-age equals the absolute session window (24 hours).
    AbsoluteWindow,
    /// Cookie max-age equals the access token TTL (15 minutes).
    TokenLifetime,
}

impl Default for AccessCookieLifetime {
    fn default() -> Self {
        AccessCookieLifetime::AbsoluteWindow
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret (must be set; there is no fallback).
    #[serde(default)]
    pub secret: String,
    /// Access token TTL in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    /// Refresh token TTL in days.
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_token_ttl_days: u64,
    /// Refresh token TTL in days when "remember me" is set.
    #[serde(default = "default_remember_ttl_days")]
    pub remember_refresh_ttl_days: u64,
    /// Remaining lifetime below which validation requests a refresh, in seconds.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_secs: u64,
    /// Absolute session window in hours (non-remember cookie lifetime).
    #[serde(default = "default_absolute_window_hours")]
    pub absolute_window_hours: u64,
    /// Whether cookies carry the Secure attribute. Disable only for local
    /// development over plain HTTP.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
    /// Path the refresh cookie is scoped to.
    #[serde(default = "default_refresh_cookie_path")]
    pub refresh_cookie_path: String,
    /// Access-cookie lifetime policy.
    #[serde(default)]
    pub access_cookie_lifetime: AccessCookieLifetime,
    /// Whether to honor the upstream-verified identity header.
    ///
    /// Only enable this when the layer that sets the header is provably
    /// unreachable by untrusted clients, such as an edge gateway this
    /// deployment fully controls. With it enabled, anyone who can reach this
    /// service directly can impersonate any user.
    #[serde(default)]
    pub trust_upstream_identity: bool,
    /// Header name carrying the upstream-verified user id.
    #[serde(default = "default_upstream_header")]
    pub upstream_identity_header: String,
    /// Name of the default guard.
    #[serde(default = "default_guard_name")]
    pub default_guard: String,
}

fn default_access_ttl() -> u64 {
    900 // 15 minutes
}

fn default_refresh_ttl_days() -> u64 {
    7
}

fn default_remember_ttl_days() -> u64 {
    30
}

fn default_refresh_threshold() -> u64 {
    300 // 5 minutes
}

fn default_absolute_window_hours() -> u64 {
    24
}

fn default_secure_cookies() -> bool {
    true
}

fn default_refresh_cookie_path() -> String {
    "/api/auth/refresh".to_string()
}

fn default_upstream_header() -> String {
    "x-verified-user".to_string()
}

fn default_guard_name() -> String {
    "session".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_days: default_refresh_ttl_days(),
            remember_refresh_ttl_days: default_remember_ttl_days(),
            refresh_threshold_secs: default_refresh_threshold(),
            absolute_window_hours: default_absolute_window_hours(),
            secure_cookies: default_secure_cookies(),
            refresh_cookie_path: default_refresh_cookie_path(),
            access_cookie_lifetime: AccessCookieLifetime::default(),
            trust_upstream_identity: false,
            upstream_identity_header: default_upstream_header(),
            default_guard: default_guard_name(),
        }
    }
}

impl AuthConfig {
    /// Refresh token TTL in seconds for the given remember-me setting.
    pub fn refresh_ttl_secs(&self, remember_me: bool) -> u64 {
        let days = if remember_me {
            self.remember_refresh_ttl_days
        } else {
            self.refresh_token_ttl_days
        };
        days * 24 * 60 * 60
    }

    /// Absolute session window in seconds.
    pub fn absolute_window_secs(&self) -> u64 {
        self.absolute_window_hours * 60 * 60
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file path. Console-only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(KeygateError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| KeygateError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `KEYGATE_AUTH_SECRET`: Override the token signing secret
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("KEYGATE_AUTH_SECRET") {
            if !secret.is_empty() {
                self.auth.secret = secret;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Fails closed: an empty signing secret is a startup error, never a
    /// silent fallback to a weak default.
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.is_empty() {
            return Err(KeygateError::Config(
                "auth.secret is not set. Set it in config.toml or via the \
                 KEYGATE_AUTH_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.auth.trust_upstream_identity && self.auth.upstream_identity_header.is_empty() {
            return Err(KeygateError::Config(
                "trust_upstream_identity is enabled but upstream_identity_header is empty"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
