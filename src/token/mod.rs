//! Token layer: claim sets, signing/verification, client fingerprinting.

mod claims;
mod codec;
mod fingerprint;

pub use claims::{AccessClaims, RefreshClaims, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
pub use codec::{ConfigSecretProvider, SecretProvider, TokenCodec, TokenError};
pub use fingerprint::generate_fingerprint;
