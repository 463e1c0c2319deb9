/// Team, membership and invitation endpoints
///
/// # Endpoints
///
/// - `GET /api/teams` - Teams the caller created or belongs to
/// - `POST /api/teams` - Create a team (caller becomes creator and admin)
/// - `GET|PUT|DELETE /api/teams/:teamId`
/// - `POST /api/teams/:teamId/members`, `DELETE /api/teams/:teamId/members/:userId`
/// - `POST /api/teams/:teamId/members/:userId/role`
/// - `GET|POST /api/teams/:teamId/invitations`
/// - `POST /api/teams/:teamId/invitations/:invitationId/revoke`
/// - `POST /api/teams/invitations/accept`
///
/// # Roles
///
/// The creator is implicit (`teams.created_by`) and passes every gate. Member
/// rows carry `member` or `admin`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
    notify,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use glacier_shared::{
    auth::{
        authorization::{require_admin, require_member, require_role},
        middleware::AuthUser,
        session::generate_invitation_token,
    },
    models::{
        invitation::Invitation,
        team::{CreateTeam, Team},
        team_member::{TeamMember, TeamRole},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidateEmail};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 2, max = 100, message = "Team name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 2, max = 100, message = "Team name must be between 2 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Body with an email address; a missing field reads as empty
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    #[serde(default)]
    pub token: String,
}

/// A team as seen by its creator
#[derive(Debug, Serialize)]
pub struct CreatedTeam {
    #[serde(flatten)]
    pub team: Team,
    pub role: &'static str,
}

fn valid_email(email: &str) -> Result<&str, ApiError> {
    let email = email.trim();
    if email.validate_email() {
        Ok(email)
    } else {
        Err(ApiError::bad_request("Valid email is required"))
    }
}

/// List the caller's teams
///
/// Created teams come first (role `creator`, newest first), then teams
/// joined as a member (most recently joined first).
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let teams = Team::list_for_user(&state.db, user.id).await?;
    Ok(Json(json!({ "teams": teams })))
}

/// Create a team
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// { "message": "Team created successfully", "team": { "id": 1, "name": "Platform", "role": "creator", ... } }
/// ```
pub async fn create_team(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<CreateTeamRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let team = Team::create_with_creator(
        &state.db,
        CreateTeam {
            name: req.name,
            description: req.description,
            created_by: user.id,
        },
    )
    .await?;

    tracing::info!(team_id = team.id, user_id = user.id, "Team created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Team created successfully",
            "team": CreatedTeam { team, role: "creator" },
        })),
    ))
}

/// Team details with creator and members (members only)
pub async fn get_team(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_member(&state.db, team_id, user.id).await?;

    let team = Team::detail(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    Ok(Json(json!({ "team": team })))
}

/// Rename or re-describe a team (admins)
pub async fn update_team(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    AppJson(req): AppJson<UpdateTeamRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&state.db, team_id, user.id).await?;
    req.validate()?;

    let team = Team::update(&state.db, team_id, req.name.as_deref(), req.description.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    Ok(Json(json!({ "message": "Team updated successfully", "team": team })))
}

/// Delete a team and, by cascade, everything in it (creator only)
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let team = Team::find_by_id(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    if team.created_by != user.id {
        return Err(ApiError::forbidden("Only team creator can delete team"));
    }

    Team::delete(&state.db, team_id).await?;
    tracing::info!(team_id, user_id = user.id, "Team deleted");

    Ok(Json(json!({ "message": "Team deleted successfully" })))
}

/// Add an existing user by email (admins)
pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    AppJson(req): AppJson<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state.db, team_id, user.id).await?;
    let email = valid_email(&req.email)?;

    let target = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let member = TeamMember::add(&state.db, team_id, target.id, TeamRole::Member)
        .await?
        .ok_or_else(|| ApiError::bad_request("User is already a team member"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Member added successfully",
            "member": {
                "id": target.id,
                "name": target.name,
                "email": target.email,
                "role": member.role,
            },
        })),
    ))
}

/// Remove a member (creator only)
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((team_id, user_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let access = require_admin(&state.db, team_id, user.id).await?;

    if user_id == user.id {
        return Err(ApiError::bad_request("Cannot remove yourself from team"));
    }

    if !access.is_creator {
        return Err(ApiError::forbidden("Only team creator can remove members"));
    }

    if !TeamMember::remove(&state.db, team_id, user_id).await? {
        return Err(ApiError::not_found("Member not found"));
    }

    tracing::info!(team_id, removed_user_id = user_id, "Member removed");
    Ok(Json(json!({ "message": "Member removed successfully" })))
}

/// Change a member's role
///
/// Admins may promote; demoting an admin takes the creator.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((team_id, user_id)): Path<(i32, i32)>,
    AppJson(req): AppJson<RoleRequest>,
) -> ApiResult<Json<Value>> {
    let role: TeamRole = req
        .role
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid role"))?;

    let access = require_role(&state.db, team_id, user.id, &[TeamRole::Admin]).await?;

    let target = TeamMember::find(&state.db, team_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    if role == TeamRole::Member && target.role == TeamRole::Admin && !access.is_creator {
        return Err(ApiError::forbidden("Only team creator can demote an admin"));
    }

    if !TeamMember::update_role(&state.db, team_id, user_id, role).await? {
        return Err(ApiError::not_found("Member not found"));
    }

    Ok(Json(json!({ "message": "Role updated", "userId": user_id, "role": role })))
}

/// Invite someone by email (admins)
///
/// A pending invitation for the same address is reused. Mail delivery runs
/// in the background and cannot fail the request.
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    AppJson(req): AppJson<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state.db, team_id, user.id).await?;
    let email = valid_email(&req.email)?;

    let team = Team::find_by_id(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    let invitation = Invitation::create_or_reuse(
        &state.db,
        team_id,
        email,
        &generate_invitation_token(),
        user.id,
    )
    .await?;

    notify::team_invite(&state, &team, email, &invitation.token, &user).await;

    tracing::info!(team_id, invitation_id = invitation.id, "Invitation sent");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Invitation sent", "invitation": invitation })),
    ))
}

/// Pending invitations, newest first (admins)
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_admin(&state.db, team_id, user.id).await?;

    let invitations = Invitation::list_pending(&state.db, team_id).await?;
    Ok(Json(json!({ "invitations": invitations })))
}

pub async fn revoke_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((team_id, invitation_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    require_admin(&state.db, team_id, user.id).await?;

    if !Invitation::revoke(&state.db, team_id, invitation_id).await? {
        return Err(ApiError::not_found("Pending invitation not found"));
    }

    Ok(Json(json!({ "message": "Invitation revoked" })))
}

/// Accept an invitation as the signed-in user
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<AcceptInvitationRequest>,
) -> ApiResult<Json<Value>> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("Token is required"));
    }

    let team_id = Invitation::accept(&state.db, token, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found or already used"))?;

    tracing::info!(team_id, user_id = user.id, "Invitation accepted");
    Ok(Json(json!({ "message": "Invitation accepted", "teamId": team_id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert_eq!(valid_email(" ada@example.com ").unwrap(), "ada@example.com");
        assert!(valid_email("ada").is_err());
        assert!(valid_email("").is_err());
    }

    #[test]
    fn test_create_team_validation() {
        let req = CreateTeamRequest {
            name: "P".to_string(),
            description: None,
        };
        assert!(req.validate().is_err());

        let req = CreateTeamRequest {
            name: "Platform".to_string(),
            description: Some("x".repeat(501)),
        };
        assert!(req.validate().is_err());
    }
}
