//! Token signing and verification.
//!
//! Compact three-segment tokens (header/claims/signature) signed with a
//! symmetric HS256 key. The signature is always checked before any claim is
//! trusted, including `exp`.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::claims::{AccessClaims, RefreshClaims, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};

/// Token-level errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No signing secret is configured. Fatal at startup, never recovered
    /// per-call and never replaced by a default secret.
    #[error("signing secret is not configured")]
    MissingSecret,

    /// The token's embedded expiry has passed.
    #[error("token has expired")]
    Expired,

    /// The signature does not match the active signing key.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The token is structurally invalid or its claims do not deserialize.
    #[error("token is malformed")]
    Malformed,

    /// The `type` claim does not match the expected token class.
    #[error("unexpected token type")]
    WrongTokenType,

    /// Signing failed (claims failed to serialize).
    #[error("token signing failed: {0}")]
    SigningFailed(String),
}

/// Source of the signing key.
///
/// Implementations must fail closed: an unset key is an error, never a
/// silently substituted placeholder.
pub trait SecretProvider: Send + Sync {
    /// The active signing key.
    fn signing_key(&self) -> Result<&str, TokenError>;
}

/// Secret provider backed by configuration.
#[derive(Debug, Clone)]
pub struct ConfigSecretProvider {
    secret: String,
}

impl ConfigSecretProvider {
    /// Wrap a configured secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SecretProvider for ConfigSecretProvider {
    fn signing_key(&self) -> Result<&str, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(&self.secret)
    }
}

/// Signs and verifies claim-bearing tokens.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lenient_validation: Validation,
}

impl TokenCodec {
    /// Create a codec from a secret provider.
    ///
    /// Fails with [`TokenError::MissingSecret`] when the provider has no key.
    pub fn new(provider: &dyn SecretProvider) -> Result<Self, TokenError> {
        let secret = provider.signing_key()?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        // Used only to recover identity claims from an expired access token
        // during refresh. The signature is still always verified.
        let mut lenient_validation = Validation::default();
        lenient_validation.validate_exp = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lenient_validation,
        })
    }

    /// Sign access claims.
    pub fn sign_access(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))
    }

    /// Sign refresh claims.
    pub fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))
    }

    /// Verify an access token and return its claims.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(map_decode_error)?;
        if data.claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(TokenError::WrongTokenType);
        }
        Ok(data.claims)
    }

    /// Verify an access token's signature but accept an expired `exp`.
    ///
    /// The refresh flow uses this to carry identity claims forward from the
    /// expiring access token without consulting the user store.
    pub fn verify_access_allow_expired(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.lenient_validation)
            .map_err(map_decode_error)?;
        if data.claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(TokenError::WrongTokenType);
        }
        Ok(data.claims)
    }

    /// Verify a refresh token and return its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let data = decode::<RefreshClaims>(token, &self.decoding_key, &self.validation)
            .map_err(map_decode_error)?;
        if data.claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(TokenError::WrongTokenType);
        }
        Ok(data.claims)
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}
