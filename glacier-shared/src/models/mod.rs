/// Database models for Glacier
///
/// Each module owns one table (or one read model over several) and exposes
/// its queries as associated functions taking a `&PgPool`, or a generic
/// executor where the call must be able to join a transaction.
///
/// # Models
///
/// - `user`, `session`: accounts and login sessions
/// - `team`, `team_member`, `invitation`: teams, roles and invitations
/// - `task`, `comment`, `activity`, `attachment`, `label`, `subtask`,
///   `time_entry`: task data
/// - `notification`, `email_preference`: in-app and email notices
/// - `chat_message`: team chat history
/// - `report`, `search`: read-only aggregates and lookups
///
/// # Example
///
/// ```no_run
/// use glacier_shared::models::user::{User, CreateUser};
/// use glacier_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity;
pub mod attachment;
pub mod chat_message;
pub mod comment;
pub mod email_preference;
pub mod invitation;
pub mod label;
pub mod notification;
pub mod report;
pub mod search;
pub mod session;
pub mod subtask;
pub mod task;
pub mod team;
pub mod team_member;
pub mod time_entry;
pub mod user;
