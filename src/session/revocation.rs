//! Server-side session revocation.
//!
//! Signed tokens are stateless, so destroying a session client-side cannot
//! invalidate a copy someone already captured. This store closes that gap
//! two ways:
//!
//! - a denylist keyed by `jti`, consulted on every validate/refresh, for
//!   revoking one session family;
//! - a per-user watermark for "invalidate all sessions of this user" in
//!   O(1): any token issued at or before the watermark fails, without
//!   per-token bookkeeping.
//!
//! Entries carry the token expiry so [`RevocationStore::prune`] can drop
//! them once they would have died naturally anyway.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

/// In-memory revocation store.
///
/// A production deployment would back this with shared storage; the
/// interface is the contract.
#[derive(Debug, Default)]
pub struct RevocationStore {
    /// Denied session ids: jti -> token expiry (for pruning).
    denied: RwLock<HashMap<String, u64>>,
    /// Per-user invalidation watermark: user id -> latest invalidated iat.
    watermarks: RwLock<HashMap<String, u64>>,
}

impl RevocationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke one session family by `jti`.
    pub async fn revoke(&self, jti: &str, exp: u64) {
        self.denied.write().await.insert(jti.to_string(), exp);
        info!(session_id = %jti, "Session revoked");
    }

    /// Whether a session family has been revoked.
    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.denied.read().await.contains_key(jti)
    }

    /// Invalidate every session of a user issued at or before `at`.
    pub async fn invalidate_user(&self, user_id: &str, at: u64) {
        self.watermarks.write().await.insert(user_id.to_string(), at);
        info!(user_id = %user_id, "All user sessions invalidated");
    }

    /// The user's current invalidation watermark, if any.
    pub async fn user_watermark(&self, user_id: &str) -> Option<u64> {
        self.watermarks.read().await.get(user_id).copied()
    }

    /// Whether a token issued at `iat` has been superseded by a user-wide
    /// invalidation.
    pub async fn is_superseded(&self, user_id: &str, iat: u64) -> bool {
        match self.user_watermark(user_id).await {
            // Inclusive: a token minted in the same second as the
            // invalidation is superseded too.
            Some(watermark) => iat <= watermark,
            None => false,
        }
    }

    /// Drop denylist entries whose tokens have expired naturally.
    pub async fn prune(&self, now: u64) -> usize {
        let mut denied = self.denied.write().await;
        let before = denied.len();
        denied.retain(|_, exp| *exp > now);
        let removed = before - denied.len();
        if removed > 0 {
            debug!(removed = removed, "Pruned expired revocation entries");
        }
        removed
    }

    /// Number of currently denied session ids.
    pub async fn denied_count(&self) -> usize {
        self.denied.read().await.len()
    }
}
