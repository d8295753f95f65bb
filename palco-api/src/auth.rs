//! Trusted-identity resolution.
//!
//! Token issuance lives outside this system; every command arrives with a
//! token that some identity provider already vouches for. The default
//! implementation validates HS256 JWTs whose `sub` claim carries the user
//! id.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use palco_core::models::UserId;
use palco_core::{Error, Result};

/// Resolves an opaque client token to a verified user id.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// HS256 JWT verification against a shared secret.
pub struct JwtIdentity {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtIdentity {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a user. Used by operational tooling and tests;
    /// production issuance belongs to the identity service.
    pub fn issue(&self, user_id: &UserId, ttl: chrono::Duration) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now() + ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Token encoding failed: {e}")))
    }
}

impl IdentityProvider for JwtIdentity {
    fn verify(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| Error::PermissionDenied(format!("Invalid token: {e}")))?;
        Ok(UserId::from(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let identity = JwtIdentity::new("test-secret");
        let user_id = UserId::new();
        let token = identity
            .issue(&user_id, chrono::Duration::minutes(5))
            .expect("issue");
        assert_eq!(identity.verify(&token).expect("verify"), user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtIdentity::new("secret-a");
        let verifier = JwtIdentity::new("secret-b");
        let token = issuer
            .issue(&UserId::new(), chrono::Duration::minutes(5))
            .expect("issue");
        assert!(matches!(
            verifier.verify(&token),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let identity = JwtIdentity::new("test-secret");
        let token = identity
            .issue(&UserId::new(), chrono::Duration::seconds(-120))
            .expect("issue");
        assert!(identity.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let identity = JwtIdentity::new("test-secret");
        assert!(identity.verify("not-a-token").is_err());
    }
}
