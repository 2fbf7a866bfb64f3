//! Token claim sets.

use serde::{Deserialize, Serialize};

use crate::store::User;

/// `type` claim value for access tokens.
pub const TOKEN_TYPE_ACCESS: &str = "access";

/// `type` claim value for refresh tokens.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id).
    pub sub: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Optional role name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Granted permissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Client fingerprint the token is bound to.
    pub fingerprint: String,
    /// Token type, always `"access"`.
    #[serde(rename = "type")]
    pub token_type: String,
    /// Session id shared by every token of one login.
    pub jti: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: u64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
}

impl AccessClaims {
    /// Build access claims for a user, valid for `ttl_secs` from `iat`.
    pub fn new(user: &User, fingerprint: &str, jti: &str, iat: u64, ttl_secs: u64) -> Self {
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            permissions: if user.permissions.is_empty() {
                None
            } else {
                Some(user.permissions.clone())
            },
            fingerprint: fingerprint.to_string(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            jti: jti.to_string(),
            iat,
            exp: iat + ttl_secs,
        }
    }

    /// The user projection embedded in these claims.
    pub fn to_user(&self) -> User {
        User {
            id: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone().unwrap_or_default(),
        }
    }
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user id).
    pub sub: String,
    /// Token type, always `"refresh"`.
    #[serde(rename = "type")]
    pub token_type: String,
    /// Client fingerprint the token is bound to.
    pub fingerprint: String,
    /// Remember-me flag, propagated unchanged through every refresh.
    pub remember_me: bool,
    /// Session id shared by every token of one login.
    pub jti: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: u64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
}

impl RefreshClaims {
    /// Build refresh claims, valid for `ttl_secs` from `iat`.
    pub fn new(
        user_id: &str,
        fingerprint: &str,
        remember_me: bool,
        jti: &str,
        iat: u64,
        ttl_secs: u64,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            token_type: TOKEN_TYPE_REFRESH.to_string(),
            fingerprint: fingerprint.to_string(),
            remember_me,
            jti: jti.to_string(),
            iat,
            exp: iat + ttl_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u-1".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Some("member".to_string()),
            permissions: vec!["boards.read".to_string()],
        }
    }

    #[test]
    fn test_access_claims_expiry_arithmetic() {
        let claims = AccessClaims::new(&sample_user(), "fp", "sid-1", 1_000, 900);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_900);
        assert_eq!(claims.token_type, TOKEN_TYPE_ACCESS);
        assert_eq!(claims.jti, "sid-1");
    }

    #[test]
    fn test_access_claims_round_trip_user() {
        let user = sample_user();
        let claims = AccessClaims::new(&user, "fp", "sid-1", 0, 900);
        assert_eq!(claims.to_user(), user);
    }

    #[test]
    fn test_access_claims_empty_permissions_omitted() {
        let mut user = sample_user();
        user.permissions.clear();
        let claims = AccessClaims::new(&user, "fp", "sid-1", 0, 900);

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("permissions").is_none());
        assert_eq!(json["type"], "access");
    }

    #[test]
    fn test_refresh_claims() {
        let claims = RefreshClaims::new("u-1", "fp", true, "sid-1", 500, 3_600);
        assert_eq!(claims.exp, 4_100);
        assert!(claims.remember_me);
        assert_eq!(claims.token_type, TOKEN_TYPE_REFRESH);

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "refresh");
    }
}
