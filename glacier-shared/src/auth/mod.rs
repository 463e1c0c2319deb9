/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`session`]: session and invitation tokens, session cookie helpers
/// - [`reset_token`]: signed, single-use password-reset tokens
/// - [`middleware`]: session-cookie authentication for Axum
/// - [`authorization`]: per-request team and task permission checks
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Sessions**: random 256-bit tokens, stored only as SHA-256 digests
/// - **Reset Tokens**: HS256 JWTs bound to the current password hash
///
/// # Example
///
/// ```no_run
/// use glacier_shared::auth::password::{hash_password, verify_password};
/// use glacier_shared::auth::session::{generate_session_token, hash_session_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = generate_session_token();
/// let stored = hash_session_token(&token);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod middleware;
pub mod password;
pub mod reset_token;
pub mod session;
