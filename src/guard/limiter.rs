//! Login attempt rate limiting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

/// Maximum failed attempts before lockout.
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Window for counting failures and lockout duration (5 minutes).
pub const LOCKOUT_DURATION_SECS: u64 = 5 * 60;

/// Result of a login attempt rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitResult {
    /// Login attempt is allowed.
    Allowed,
    /// Account is locked for the given remaining duration.
    Locked(Duration),
}

/// Tracks failed login attempts per email and enforces lockout after too
/// many failures inside the window.
#[derive(Debug)]
pub struct LoginLimiter {
    /// Failure timestamps per lowercased email.
    attempts: HashMap<String, Vec<Instant>>,
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginLimiter {
    /// Create a limiter with default settings.
    pub fn new() -> Self {
        Self::with_config(
            MAX_LOGIN_ATTEMPTS,
            LOCKOUT_DURATION_SECS,
            LOCKOUT_DURATION_SECS,
        )
    }

    /// Create a limiter with custom settings.
    pub fn with_config(max_attempts: u32, window_secs: u64, lockout_secs: u64) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts,
            window: Duration::from_secs(window_secs),
            lockout: Duration::from_secs(lockout_secs),
        }
    }

    /// Check whether a login attempt is allowed for the given email.
    pub fn check(&mut self, email: &str) -> LimitResult {
        let now = Instant::now();
        let attempts = self.attempts.entry(email.to_lowercase()).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);

        if attempts.len() >= self.max_attempts as usize {
            if let Some(oldest) = attempts.first() {
                let elapsed = now.duration_since(*oldest);
                if elapsed < self.lockout {
                    return LimitResult::Locked(self.lockout - elapsed);
                }
                attempts.clear();
            }
        }

        LimitResult::Allowed
    }

    /// Record a failed login attempt.
    pub fn record_failure(&mut self, email: &str) {
        let now = Instant::now();
        let attempts = self.attempts.entry(email.to_lowercase()).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);
        attempts.push(now);

        debug!(
            email = %email,
            attempt_count = attempts.len(),
            "Recorded failed login attempt"
        );
    }

    /// Clear all attempts for an email (on successful login).
    pub fn clear(&mut self, email: &str) {
        self.attempts.remove(&email.to_lowercase());
    }

    /// Number of failed attempts currently counted for an email.
    pub fn attempt_count(&mut self, email: &str) -> usize {
        let now = Instant::now();
        match self.attempts.get_mut(&email.to_lowercase()) {
            Some(attempts) => {
                attempts.retain(|t| now.duration_since(*t) < self.window);
                attempts.len()
            }
            None => 0,
        }
    }

    /// Drop expired entries to bound memory growth.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        self.attempts.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < self.window);
            !attempts.is_empty()
        });
    }
}
