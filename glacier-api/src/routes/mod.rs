/// API route handlers
///
/// One module per resource, mounted under `/api` by [`crate::app::build_router`]:
///
/// - `health`: Liveness probe
/// - `auth`: Register, login, logout and password reset
/// - `teams`: Teams, members, roles and invitations
/// - `tasks`, `comments`, `attachments`, `labels`, `subtasks`, `time_entries`: Task work
/// - `notifications`, `email`: In-app notifications and email preferences
/// - `search`, `reports`, `users`: Cross-cutting reads and the profile
/// - `chat`: Team chat history and posting

pub mod attachments;
pub mod auth;
pub mod chat;
pub mod comments;
pub mod email;
pub mod health;
pub mod labels;
pub mod notifications;
pub mod reports;
pub mod search;
pub mod subtasks;
pub mod tasks;
pub mod teams;
pub mod time_entries;
pub mod users;

/// Parses an optional query value, treating blank or unparseable input as absent
pub(crate) fn parsed<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}
