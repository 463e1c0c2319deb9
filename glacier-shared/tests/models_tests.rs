/// Database-backed tests for the models and authorization checks
///
/// Run with: cargo test --test models_tests -- --test-threads=1

mod common;

use chrono::Duration;
use common::{unique, TestContext};
use glacier_shared::auth::authorization::{
    require_admin, require_member, require_role, require_task_access, AuthzError,
};
use glacier_shared::auth::session::{generate_invitation_token, hash_session_token};
use glacier_shared::models::email_preference::{
    DigestFrequency, EmailPreferences, UpdateEmailPreferences,
};
use glacier_shared::models::invitation::Invitation;
use glacier_shared::models::label::{Label, DEFAULT_LABEL_COLOR};
use glacier_shared::models::session::Session;
use glacier_shared::models::task::{Task, TaskStatus, UpdateTask};
use glacier_shared::models::team::Team;
use glacier_shared::models::team_member::{TeamMember, TeamRole};
use glacier_shared::models::time_entry::TimeEntry;

#[tokio::test]
async fn test_team_creator_is_admin_member() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let team = ctx.team(&owner).await;

    let row = TeamMember::find(&ctx.pool, team.id, owner.id)
        .await
        .unwrap()
        .expect("creator should have a member row");
    assert_eq!(row.role, TeamRole::Admin);

    let teams = Team::list_for_user(&ctx.pool, owner.id).await.unwrap();
    let listed = teams.iter().find(|t| t.id == team.id).expect("team listed");
    assert_eq!(listed.role, "creator");
}

#[tokio::test]
async fn test_list_puts_created_before_joined() {
    let ctx = TestContext::new().await;
    let alice = ctx.user("Alice").await;
    let bob = ctx.user("Bob").await;

    let joined = ctx.team(&bob).await;
    TeamMember::add(&ctx.pool, joined.id, alice.id, TeamRole::Member)
        .await
        .unwrap();
    let created = ctx.team(&alice).await;

    let teams = Team::list_for_user(&ctx.pool, alice.id).await.unwrap();
    let ids: Vec<i32> = teams.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![created.id, joined.id]);
    assert_eq!(teams[1].role, "member");
    assert!(teams[1].joined_at.is_some());
}

#[tokio::test]
async fn test_membership_gates() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let member = ctx.user("Member").await;
    let outsider = ctx.user("Outsider").await;
    let team = ctx.team(&owner).await;
    TeamMember::add(&ctx.pool, team.id, member.id, TeamRole::Member)
        .await
        .unwrap();

    assert!(require_member(&ctx.pool, team.id, member.id).await.is_ok());
    assert!(matches!(
        require_member(&ctx.pool, team.id, outsider.id).await,
        Err(AuthzError::NotMember)
    ));
    assert!(matches!(
        require_admin(&ctx.pool, team.id, member.id).await,
        Err(AuthzError::NotAdmin)
    ));
    assert!(require_admin(&ctx.pool, team.id, owner.id).await.is_ok());

    assert!(matches!(
        require_role(&ctx.pool, -1, owner.id, &[TeamRole::Admin]).await,
        Err(AuthzError::TeamNotFound)
    ));
    assert!(matches!(
        require_role(&ctx.pool, team.id, member.id, &[TeamRole::Admin]).await,
        Err(AuthzError::InsufficientPermissions)
    ));
}

#[tokio::test]
async fn test_task_access() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let outsider = ctx.user("Outsider").await;
    let team = ctx.team(&owner).await;
    let task = ctx.task(&team, &owner, None).await;

    let (found, access) = require_task_access(&ctx.pool, task.id, owner.id).await.unwrap();
    assert_eq!(found.id, task.id);
    assert!(access.is_creator);

    assert!(matches!(
        require_task_access(&ctx.pool, task.id, outsider.id).await,
        Err(AuthzError::AccessDenied)
    ));
    assert!(matches!(
        require_task_access(&ctx.pool, -1, owner.id).await,
        Err(AuthzError::TaskNotFound)
    ));
}

#[tokio::test]
async fn test_invitation_reuse_and_accept() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let invitee = ctx.user("Invitee").await;
    let team = ctx.team(&owner).await;

    let first = Invitation::create_or_reuse(
        &ctx.pool,
        team.id,
        &invitee.email,
        &generate_invitation_token(),
        owner.id,
    )
    .await
    .unwrap();
    let second = Invitation::create_or_reuse(
        &ctx.pool,
        team.id,
        &invitee.email,
        &generate_invitation_token(),
        owner.id,
    )
    .await
    .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.token, second.token);

    let team_id = Invitation::accept(&ctx.pool, &first.token, invitee.id).await.unwrap();
    assert_eq!(team_id, Some(team.id));
    assert!(require_member(&ctx.pool, team.id, invitee.id).await.is_ok());

    // Accepted invitations cannot be used again.
    let again = Invitation::accept(&ctx.pool, &first.token, invitee.id).await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_timer_cannot_start_twice() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let team = ctx.team(&owner).await;
    let task = ctx.task(&team, &owner, None).await;

    let started = TimeEntry::start(&ctx.pool, task.id, owner.id).await.unwrap();
    assert!(started.is_some());

    let again = TimeEntry::start(&ctx.pool, task.id, owner.id).await.unwrap();
    assert!(again.is_none());

    let stopped = TimeEntry::stop(&ctx.pool, task.id, owner.id)
        .await
        .unwrap()
        .expect("running timer should stop");
    assert!(stopped.end_time.is_some());
    assert_eq!(stopped.duration_minutes, Some(1));

    assert!(TimeEntry::stop(&ctx.pool, task.id, owner.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_label_assignment_ignores_foreign_labels() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let team = ctx.team(&owner).await;
    let other_team = ctx.team(&owner).await;
    let task = ctx.task(&team, &owner, None).await;

    let ours = Label::create(&ctx.pool, team.id, &unique("bug"), DEFAULT_LABEL_COLOR, owner.id)
        .await
        .unwrap();
    let theirs = Label::create(&ctx.pool, other_team.id, &unique("bug"), DEFAULT_LABEL_COLOR, owner.id)
        .await
        .unwrap();

    let valid = Label::assign_to_task(&ctx.pool, task.id, team.id, &[ours.id, theirs.id])
        .await
        .unwrap();
    assert_eq!(valid, 1);

    // Re-assigning is a no-op.
    Label::assign_to_task(&ctx.pool, task.id, team.id, &[ours.id])
        .await
        .unwrap();

    let labels = Label::list_for_task(&ctx.pool, task.id).await.unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].id, ours.id);
}

#[tokio::test]
async fn test_duplicate_label_name_is_unique_violation() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let team = ctx.team(&owner).await;
    let name = unique("feature");

    Label::create(&ctx.pool, team.id, &name, DEFAULT_LABEL_COLOR, owner.id)
        .await
        .unwrap();
    let err = Label::create(&ctx.pool, team.id, &name, DEFAULT_LABEL_COLOR, owner.id)
        .await
        .unwrap_err();

    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
}

#[tokio::test]
async fn test_task_update_is_idempotent_and_delete_cascades() {
    let ctx = TestContext::new().await;
    let owner = ctx.user("Owner").await;
    let team = ctx.team(&owner).await;
    let task = ctx.task(&team, &owner, Some(&owner)).await;
    TimeEntry::start(&ctx.pool, task.id, owner.id).await.unwrap();

    let changes = UpdateTask {
        status: Some(TaskStatus::InProgress),
        assigned_to: Some(None),
        ..Default::default()
    };
    let once = Task::update(&ctx.pool, task.id, &changes).await.unwrap().unwrap();
    let twice = Task::update(&ctx.pool, task.id, &changes).await.unwrap().unwrap();
    assert_eq!(once.status, twice.status);
    assert_eq!(twice.assigned_to, None);
    assert_eq!(once.title, task.title);

    assert!(Task::delete(&ctx.pool, task.id).await.unwrap());
    let entries = TimeEntry::list_for_task(&ctx.pool, task.id).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_digest_recipients_by_frequency() {
    let ctx = TestContext::new().await;
    let daily = ctx.user("Daily").await;
    let weekly = ctx.user("Weekly").await;

    EmailPreferences::upsert(
        &ctx.pool,
        daily.id,
        &UpdateEmailPreferences {
            digest_frequency: Some(DigestFrequency::Daily),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    EmailPreferences::upsert(
        &ctx.pool,
        weekly.id,
        &UpdateEmailPreferences {
            digest_frequency: Some(DigestFrequency::Weekly),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let daily_ids: Vec<i32> = EmailPreferences::digest_recipients(&ctx.pool, DigestFrequency::Daily)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert!(daily_ids.contains(&daily.id));
    assert!(!daily_ids.contains(&weekly.id));

    let prefs = EmailPreferences::for_user(&ctx.pool, weekly.id).await.unwrap();
    assert!(prefs.instant_comment);
}

#[tokio::test]
async fn test_expired_sessions_are_ignored() {
    let ctx = TestContext::new().await;
    let user = ctx.user("Sessions").await;

    let live = hash_session_token(&unique("live"));
    let stale = hash_session_token(&unique("stale"));
    Session::create(&ctx.pool, user.id, &live, Duration::hours(1)).await.unwrap();
    Session::create(&ctx.pool, user.id, &stale, Duration::seconds(-1)).await.unwrap();

    assert_eq!(
        Session::find_user(&ctx.pool, &live).await.unwrap().map(|u| u.id),
        Some(user.id)
    );
    assert!(Session::find_user(&ctx.pool, &stale).await.unwrap().is_none());

    assert!(Session::purge_expired(&ctx.pool).await.unwrap() >= 1);
}
