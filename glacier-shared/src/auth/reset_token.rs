/// Password-reset tokens
///
/// A reset token is a JWT signed with HS256 using the session secret. It
/// carries the user ID, a `purpose` claim so it cannot be confused with any
/// other token, and a fingerprint of the user's current password hash. Once
/// the password changes the fingerprint no longer matches, so a token works
/// at most once.
///
/// # Example
///
/// ```
/// use glacier_shared::auth::reset_token::{create_reset_token, validate_reset_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-session-secret-of-at-least-32-bytes!";
/// let token = create_reset_token(7, "$argon2id$hash", secret)?;
///
/// let claims = validate_reset_token(&token, secret)?;
/// assert_eq!(claims.sub, 7);
/// assert!(claims.matches_password("$argon2id$hash"));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const ISSUER: &str = "glacier";
const PURPOSE: &str = "password_reset";

/// How long a reset link stays valid
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Error type for reset token operations
#[derive(Debug, thiserror::Error)]
pub enum ResetTokenError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Reset token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    /// User ID
    pub sub: i32,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: String,

    /// Fingerprint of the password hash at issue time
    pub fp: String,
}

impl ResetClaims {
    fn new(user_id: i32, password_hash: &str) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(RESET_TOKEN_TTL_MINUTES)).timestamp(),
            purpose: PURPOSE.to_string(),
            fp: fingerprint(password_hash),
        }
    }

    /// True while the user's password is unchanged since the token was issued
    pub fn matches_password(&self, password_hash: &str) -> bool {
        self.fp == fingerprint(password_hash)
    }
}

fn fingerprint(password_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password_hash.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// Issues a reset token for a user
pub fn create_reset_token(
    user_id: i32,
    password_hash: &str,
    secret: &str,
) -> Result<String, ResetTokenError> {
    let claims = ResetClaims::new(user_id, password_hash);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| ResetTokenError::CreateError(e.to_string()))
}

/// Verifies signature, issuer, expiry and purpose
pub fn validate_reset_token(token: &str, secret: &str) -> Result<ResetClaims, ResetTokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let data = decode::<ResetClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => ResetTokenError::Expired,
        _ => ResetTokenError::Invalid(e.to_string()),
    })?;

    if data.claims.purpose != PURPOSE {
        return Err(ResetTokenError::Invalid("wrong purpose".to_string()));
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    #[test]
    fn test_round_trip() {
        let token = create_reset_token(42, "hash-a", SECRET).unwrap();
        let claims = validate_reset_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "glacier");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_reset_token(42, "hash-a", SECRET).unwrap();
        let result = validate_reset_token(&token, "another-secret-key-that-is-long");
        assert!(matches!(result, Err(ResetTokenError::Invalid(_))));
    }

    #[test]
    fn test_token_dies_with_password_change() {
        let token = create_reset_token(42, "hash-a", SECRET).unwrap();
        let claims = validate_reset_token(&token, SECRET).unwrap();

        assert!(claims.matches_password("hash-a"));
        assert!(!claims.matches_password("hash-b"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = ResetClaims::new(1, "hash");
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            validate_reset_token(&token, SECRET),
            Err(ResetTokenError::Expired)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_reset_token("not.a.token", SECRET).is_err());
    }
}
