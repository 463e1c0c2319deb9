/// Session and invitation tokens
///
/// # Security
///
/// - **Session token**: 32 random bytes from the OS RNG, hex-encoded (64 chars)
/// - **Storage**: only the SHA-256 of the token is stored in `sessions`
/// - **Cookie**: `glacier.sid`, HttpOnly, `SameSite=Lax`, `Secure` when configured
/// - **Invitation token**: 16 random bytes, hex-encoded (32 chars), stored as is
///
/// # Example
///
/// ```
/// use glacier_shared::auth::session::{generate_session_token, hash_session_token};
///
/// let token = generate_session_token();
/// assert_eq!(token.len(), 64);
///
/// let hash = hash_session_token(&token);
/// assert_eq!(hash.len(), 64);
/// assert_ne!(hash, token);
/// ```

use axum::http::HeaderMap;
use axum_extra::headers::{Cookie, HeaderMapExt};
use chrono::Duration;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "glacier.sid";

/// Session lifetime in hours
pub const SESSION_TTL_HOURS: i64 = 24;

/// Session lifetime
pub fn session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generates a new plaintext session token
pub fn generate_session_token() -> String {
    random_hex(32)
}

/// Generates a new invitation token
pub fn generate_invitation_token() -> String {
    random_hex(16)
}

/// SHA-256 of a session token, hex-encoded
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// `Set-Cookie` value that stores a session token
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut parts = vec![format!("{}={}", SESSION_COOKIE, token)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    parts.push(format!("Max-Age={}", session_ttl().num_seconds()));
    if secure {
        parts.push("Secure".into());
    }

    parts.join("; ")
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    let mut parts = vec![format!("{}=", SESSION_COOKIE)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    if secure {
        parts.push("Secure".into());
    }

    parts.join("; ")
}

/// Reads the session token from the request's `Cookie` header
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.typed_get::<Cookie>()?;
    cookies
        .get(SESSION_COOKIE)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let invite = generate_invitation_token();
        assert_eq!(invite.len(), 32);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_session_token("abc"), hash_session_token("abc"));
        assert_ne!(hash_session_token("abc"), hash_session_token("abd"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", false);
        assert!(cookie.starts_with("glacier.sid=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("tok", true).ends_with("Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers).is_none());

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; glacier.sid=abc123"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("glacier.sid="));
        assert!(token_from_headers(&headers).is_none());
    }
}
