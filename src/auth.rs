//! Session token issuing and verification.
//!
//! Tokens are HS256-signed JWTs whose subject is the session identifier.
//! Possession is sufficient: nothing binds a token to the caller.

use crate::error::{GatewayError, Result};
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Session identifier.
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Signs and verifies session tokens with a single static key.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl CredentialCodec {
    /// Creates a codec. With `enforce_expiry` off, expired tokens still resolve.
    pub fn new(secret: &str, ttl: Duration, enforce_expiry: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = enforce_expiry;
        validation.set_required_spec_claims(if enforce_expiry {
            &["sub", "exp"][..]
        } else {
            &["sub"][..]
        });

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            validation,
        }
    }

    /// Issues a token for `id`, valid from now for the configured lifetime.
    pub fn issue(&self, id: &SessionId) -> Result<String> {
        self.issue_at(id, Utc::now())
    }

    /// Issues a token as if it were created at `issued_at`.
    pub fn issue_at(&self, id: &SessionId, issued_at: DateTime<Utc>) -> Result<String> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| GatewayError::internal(format!("Invalid token lifetime: {e}")))?;
        let claims = Claims {
            sub: id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::internal(format!("Token encoding error: {e}")))
    }

    /// Verifies a token and returns the session identifier it carries.
    ///
    /// The session itself may no longer exist; callers look it up separately.
    pub fn resolve(&self, token: &str) -> Result<SessionId> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => GatewayError::invalid_credential("Token has expired"),
                ErrorKind::InvalidSignature => {
                    GatewayError::invalid_credential("Token signature is invalid")
                }
                _ => GatewayError::invalid_credential(format!("Malformed token: {e}")),
            }
        })?;

        data.claims.sub.parse()
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("ttl", &self.ttl)
            .field("enforce_expiry", &self.validation.validate_exp)
            .finish_non_exhaustive()
    }
}
