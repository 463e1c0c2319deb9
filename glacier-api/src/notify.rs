/// In-app notifications with their matching emails
///
/// These run after the primary write has succeeded. A failure here is
/// logged and never fails the request that triggered it.

use glacier_shared::auth::middleware::AuthUser;
use glacier_shared::models::{
    email_preference::EmailPreferences,
    notification::{
        NewNotification, Notification, TYPE_COMMENT_ADDED, TYPE_TASK_ASSIGNED, TYPE_TEAM_INVITE,
    },
    task::Task,
    team::Team,
    user::User,
};

use crate::app::AppState;

/// Which instant-email switch gates a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Instant {
    TaskAssigned,
    Comment,
    TeamInvite,
}

impl Instant {
    fn enabled(self, prefs: &EmailPreferences) -> bool {
        match self {
            Instant::TaskAssigned => prefs.instant_task_assigned,
            Instant::Comment => prefs.instant_comment,
            Instant::TeamInvite => prefs.instant_team_invite,
        }
    }
}

/// Looks up the recipient's address when their preference allows the email
async fn email_recipient(
    state: &AppState,
    user_id: i32,
    kind: Instant,
) -> Result<Option<String>, sqlx::Error> {
    let prefs = EmailPreferences::for_user(&state.db, user_id).await?;
    if !kind.enabled(&prefs) {
        return Ok(None);
    }

    Ok(User::find_by_id(&state.db, user_id).await?.map(|u| u.email))
}

/// Notifies a new assignee; does nothing when users assign themselves
pub async fn task_assigned(state: &AppState, task: &Task, actor: &AuthUser) {
    let Some(assignee) = task.assigned_to.filter(|&id| id != actor.id) else {
        return;
    };

    let result = async {
        Notification::create(
            &state.db,
            NewNotification {
                user_id: assignee,
                kind: TYPE_TASK_ASSIGNED,
                title: "Task Assigned".to_string(),
                message: format!("{} assigned you to \"{}\"", actor.name, task.title),
                related_task_id: Some(task.id),
                related_team_id: Some(task.team_id),
                triggered_by: Some(actor.id),
                ..Default::default()
            },
        )
        .await?;

        if let Some(email) = email_recipient(state, assignee, Instant::TaskAssigned).await? {
            let link = state.client_link(&format!("/tasks/{}", task.id));
            state.send_email(
                &email,
                format!("Task assigned: {}", task.title),
                state.templates.task_assigned(&actor.name, &task.title, Some(&link)),
            );
        }

        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = result {
        tracing::warn!(task_id = task.id, assignee, error = %e, "Task assignment notification failed");
    }
}

/// Users told about a new comment: the assignee, then the task creator,
/// never the commenter and never twice
pub fn comment_recipients(task: &Task, commenter_id: i32) -> Vec<i32> {
    let mut recipients = Vec::with_capacity(2);

    if let Some(assignee) = task.assigned_to.filter(|&id| id != commenter_id) {
        recipients.push(assignee);
    }

    if task.created_by != commenter_id && Some(task.created_by) != task.assigned_to {
        recipients.push(task.created_by);
    }

    recipients
}

pub async fn comment_added(state: &AppState, task: &Task, comment_id: i32, body: &str, actor: &AuthUser) {
    for recipient in comment_recipients(task, actor.id) {
        let result = async {
            Notification::create(
                &state.db,
                NewNotification {
                    user_id: recipient,
                    kind: TYPE_COMMENT_ADDED,
                    title: "New Comment".to_string(),
                    message: format!("{} commented on \"{}\"", actor.name, task.title),
                    related_task_id: Some(task.id),
                    related_comment_id: Some(comment_id),
                    triggered_by: Some(actor.id),
                    ..Default::default()
                },
            )
            .await?;

            if let Some(email) = email_recipient(state, recipient, Instant::Comment).await? {
                let link = state.client_link(&format!("/tasks/{}", task.id));
                state.send_email(
                    &email,
                    format!("New comment on: {}", task.title),
                    state
                        .templates
                        .comment_added(&actor.name, &task.title, body, Some(&link)),
                );
            }

            Ok::<_, sqlx::Error>(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(task_id = task.id, recipient, error = %e, "Comment notification failed");
        }
    }
}

/// Emails an invitation and, for existing accounts, adds a notification
///
/// An existing account's `instant_team_invite` switch gates only the email.
pub async fn team_invite(state: &AppState, team: &Team, invitee_email: &str, token: &str, inviter: &AuthUser) {
    let result = async {
        let existing = User::find_by_email(&state.db, invitee_email).await?;

        let wants_email = match &existing {
            Some(user) => {
                Notification::create(
                    &state.db,
                    NewNotification {
                        user_id: user.id,
                        kind: TYPE_TEAM_INVITE,
                        title: "Team Invitation".to_string(),
                        message: format!("{} invited you to join \"{}\"", inviter.name, team.name),
                        related_team_id: Some(team.id),
                        triggered_by: Some(inviter.id),
                        ..Default::default()
                    },
                )
                .await?;

                let prefs = EmailPreferences::for_user(&state.db, user.id).await?;
                Instant::TeamInvite.enabled(&prefs)
            }
            None => true,
        };

        if wants_email {
            let link = state.client_link(&format!("/accept-invite?token={}", token));
            state.send_email(
                invitee_email,
                format!("[{}] Team Invitation", state.app_name()),
                state.templates.team_invite(&inviter.name, &team.name, &link),
            );
        }

        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = result {
        tracing::warn!(team_id = team.id, error = %e, "Invitation notification failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use glacier_shared::models::task::{TaskPriority, TaskStatus};

    fn task(created_by: i32, assigned_to: Option<i32>) -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            title: "Write docs".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            team_id: 1,
            assigned_to,
            created_by,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_comment_recipients() {
        // Third party comments: assignee then creator
        assert_eq!(comment_recipients(&task(1, Some(2)), 3), vec![2, 1]);

        // Assignee comments: only the creator
        assert_eq!(comment_recipients(&task(1, Some(2)), 2), vec![1]);

        // Creator comments on own task assigned to someone else
        assert_eq!(comment_recipients(&task(1, Some(2)), 1), vec![2]);

        // Creator assigned to self: nobody else to tell
        assert_eq!(comment_recipients(&task(1, Some(1)), 1), Vec::<i32>::new());

        // Unassigned
        assert_eq!(comment_recipients(&task(1, None), 3), vec![1]);
    }

    #[test]
    fn test_instant_switches() {
        let mut prefs = EmailPreferences::default_for(1);
        assert!(Instant::Comment.enabled(&prefs));

        prefs.instant_comment = false;
        assert!(!Instant::Comment.enabled(&prefs));
        assert!(Instant::TaskAssigned.enabled(&prefs));
    }
}
