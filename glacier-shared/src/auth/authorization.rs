/// Team and task permission checks
///
/// Nothing is cached between requests: every check reloads the caller's
/// relation to the team from `teams.created_by` and `team_members`.
///
/// # Permission Model
///
/// 1. **Creator**: `teams.created_by`; passes every team check
/// 2. **Admin**: a member row with role `admin`
/// 3. **Member**: any member row
/// 4. **Task access**: team member, team creator, or the task's creator
///
/// # Example
///
/// ```no_run
/// use glacier_shared::auth::authorization::{require_admin, require_task_access};
/// use sqlx::PgPool;
///
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let access = require_admin(pool, 1, 42).await?;
/// assert!(access.is_admin());
///
/// let (task, _) = require_task_access(pool, 7, 42).await?;
/// println!("{}", task.title);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use crate::models::task::Task;
use crate::models::team_member::TeamRole;

/// Error type for authorization checks
///
/// The display text of each variant is the message returned to clients.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Team not found")]
    TeamNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Team membership required")]
    NotMember,

    #[error("Admin access required")]
    NotAdmin,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Access denied")]
    AccessDenied,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl AuthzError {
    /// True for the variants that map to 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuthzError::TeamNotFound | AuthzError::TaskNotFound)
    }
}

/// The caller's relation to one team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAccess {
    pub team_id: i32,
    pub created_by: i32,
    pub is_creator: bool,

    /// Role of the caller's member row, if any
    pub role: Option<TeamRole>,
}

impl TeamAccess {
    /// Loads the caller's relation to a team; `None` when the team is missing
    pub async fn load(pool: &PgPool, team_id: i32, user_id: i32) -> Result<Option<Self>, sqlx::Error> {
        let row: Option<(i32, Option<TeamRole>)> = sqlx::query_as(
            r#"
            SELECT t.created_by, tm.role
            FROM teams t
            LEFT JOIN team_members tm ON tm.team_id = t.id AND tm.user_id = $2
            WHERE t.id = $1
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(created_by, role)| Self {
            team_id,
            created_by,
            is_creator: created_by == user_id,
            role,
        }))
    }

    pub fn is_member(&self) -> bool {
        self.is_creator || self.role.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_creator || self.role == Some(TeamRole::Admin)
    }

    /// Creator always passes; otherwise the member role must be listed
    pub fn check_role(&self, roles: &[TeamRole]) -> Result<(), AuthzError> {
        if self.is_creator {
            return Ok(());
        }

        match self.role {
            None => Err(AuthzError::NotMember),
            Some(role) if roles.contains(&role) => Ok(()),
            Some(_) => Err(AuthzError::InsufficientPermissions),
        }
    }
}

/// Requires the caller to be the creator or a member of the team
pub async fn require_member(pool: &PgPool, team_id: i32, user_id: i32) -> Result<TeamAccess, AuthzError> {
    match TeamAccess::load(pool, team_id, user_id).await? {
        Some(access) if access.is_member() => Ok(access),
        _ => Err(AuthzError::NotMember),
    }
}

/// Requires the caller to be the creator or an admin of the team
pub async fn require_admin(pool: &PgPool, team_id: i32, user_id: i32) -> Result<TeamAccess, AuthzError> {
    match TeamAccess::load(pool, team_id, user_id).await? {
        Some(access) if access.is_admin() => Ok(access),
        _ => Err(AuthzError::NotAdmin),
    }
}

/// Requires one of `roles`, distinguishing a missing team from a non-member
pub async fn require_role(
    pool: &PgPool,
    team_id: i32,
    user_id: i32,
    roles: &[TeamRole],
) -> Result<TeamAccess, AuthzError> {
    let access = TeamAccess::load(pool, team_id, user_id)
        .await?
        .ok_or(AuthzError::TeamNotFound)?;

    access.check_role(roles)?;
    Ok(access)
}

/// Loads a task the caller may work on, with the caller's team relation
pub async fn require_task_access(
    pool: &PgPool,
    task_id: i32,
    user_id: i32,
) -> Result<(Task, TeamAccess), AuthzError> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or(AuthzError::TaskNotFound)?;

    let access = TeamAccess::load(pool, task.team_id, user_id)
        .await?
        .ok_or(AuthzError::TaskNotFound)?;

    if access.is_member() || task.created_by == user_id {
        Ok((task, access))
    } else {
        Err(AuthzError::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(is_creator: bool, role: Option<TeamRole>) -> TeamAccess {
        TeamAccess {
            team_id: 1,
            created_by: if is_creator { 10 } else { 99 },
            is_creator,
            role,
        }
    }

    #[test]
    fn test_creator_is_member_and_admin() {
        let creator = access(true, None);
        assert!(creator.is_member());
        assert!(creator.is_admin());
        assert!(creator.check_role(&[TeamRole::Admin]).is_ok());
    }

    #[test]
    fn test_member_row_roles() {
        let member = access(false, Some(TeamRole::Member));
        assert!(member.is_member());
        assert!(!member.is_admin());

        let admin = access(false, Some(TeamRole::Admin));
        assert!(admin.is_admin());
    }

    #[test]
    fn test_check_role_errors() {
        let outsider = access(false, None);
        assert!(matches!(
            outsider.check_role(&[TeamRole::Member, TeamRole::Admin]),
            Err(AuthzError::NotMember)
        ));

        let member = access(false, Some(TeamRole::Member));
        assert!(matches!(
            member.check_role(&[TeamRole::Admin]),
            Err(AuthzError::InsufficientPermissions)
        ));
        assert!(member.check_role(&[TeamRole::Member, TeamRole::Admin]).is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(AuthzError::NotMember.to_string(), "Team membership required");
        assert_eq!(AuthzError::NotAdmin.to_string(), "Admin access required");
        assert_eq!(AuthzError::AccessDenied.to_string(), "Access denied");
        assert!(AuthzError::TaskNotFound.is_not_found());
        assert!(!AuthzError::AccessDenied.is_not_found());
    }
}
