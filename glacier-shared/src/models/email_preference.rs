/// Per-user email preferences
///
/// A user without a row gets [`EmailPreferences::default`]: every instant
/// email on and a weekly digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;

/// How often the digest email goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "digest_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DigestFrequency {
    Off,
    Daily,
    Weekly,
}

impl DigestFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestFrequency::Off => "off",
            DigestFrequency::Daily => "daily",
            DigestFrequency::Weekly => "weekly",
        }
    }
}

impl FromStr for DigestFrequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(DigestFrequency::Off),
            "daily" => Ok(DigestFrequency::Daily),
            "weekly" => Ok(DigestFrequency::Weekly),
            _ => Err(()),
        }
    }
}

/// Which instant emails a user receives, and the digest cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EmailPreferences {
    pub user_id: i32,
    pub instant_task_assigned: bool,
    pub instant_comment: bool,
    pub instant_team_invite: bool,
    pub deadline_reminders: bool,
    pub digest_frequency: DigestFrequency,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EmailPreferences {
    /// Defaults applied when a user has never saved preferences
    pub fn default_for(user_id: i32) -> Self {
        Self {
            user_id,
            instant_task_assigned: true,
            instant_comment: true,
            instant_team_invite: true,
            deadline_reminders: true,
            digest_frequency: DigestFrequency::Weekly,
            updated_at: None,
        }
    }
}

/// Partial update; `None` keeps the stored (or default) value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmailPreferences {
    pub instant_task_assigned: Option<bool>,
    pub instant_comment: Option<bool>,
    pub instant_team_invite: Option<bool>,
    pub deadline_reminders: Option<bool>,
    pub digest_frequency: Option<DigestFrequency>,
}

impl EmailPreferences {
    /// The saved row, if any
    pub async fn find(pool: &PgPool, user_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailPreferences>(
            r#"
            SELECT user_id, instant_task_assigned, instant_comment, instant_team_invite,
                   deadline_reminders, digest_frequency, updated_at
            FROM user_email_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// The saved row or the defaults
    pub async fn for_user(pool: &PgPool, user_id: i32) -> Result<Self, sqlx::Error> {
        Ok(Self::find(pool, user_id)
            .await?
            .unwrap_or_else(|| Self::default_for(user_id)))
    }

    /// Inserts or updates the user's row in one statement
    pub async fn upsert(
        pool: &PgPool,
        user_id: i32,
        changes: &UpdateEmailPreferences,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, EmailPreferences>(
            r#"
            INSERT INTO user_email_preferences
                (user_id, instant_task_assigned, instant_comment, instant_team_invite,
                 deadline_reminders, digest_frequency)
            VALUES ($1, COALESCE($2, TRUE), COALESCE($3, TRUE), COALESCE($4, TRUE),
                    COALESCE($5, TRUE), COALESCE($6, 'weekly'::digest_frequency))
            ON CONFLICT (user_id) DO UPDATE SET
                instant_task_assigned = COALESCE($2, user_email_preferences.instant_task_assigned),
                instant_comment = COALESCE($3, user_email_preferences.instant_comment),
                instant_team_invite = COALESCE($4, user_email_preferences.instant_team_invite),
                deadline_reminders = COALESCE($5, user_email_preferences.deadline_reminders),
                digest_frequency = COALESCE($6, user_email_preferences.digest_frequency),
                updated_at = NOW()
            RETURNING user_id, instant_task_assigned, instant_comment, instant_team_invite,
                      deadline_reminders, digest_frequency, updated_at
            "#,
        )
        .bind(user_id)
        .bind(changes.instant_task_assigned)
        .bind(changes.instant_comment)
        .bind(changes.instant_team_invite)
        .bind(changes.deadline_reminders)
        .bind(changes.digest_frequency)
        .fetch_one(pool)
        .await
    }

    /// Recipients of a digest at the given cadence
    pub async fn digest_recipients(
        pool: &PgPool,
        frequency: DigestFrequency,
    ) -> Result<Vec<DigestRecipient>, sqlx::Error> {
        sqlx::query_as::<_, DigestRecipient>(
            r#"
            SELECT u.id, u.name, u.email
            FROM user_email_preferences p
            JOIN users u ON u.id = p.user_id
            WHERE p.digest_frequency = $1
            ORDER BY u.id
            "#,
        )
        .bind(frequency)
        .fetch_all(pool)
        .await
    }
}

/// A user due for a digest email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestRecipient {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything_weekly() {
        let prefs = EmailPreferences::default_for(9);
        assert!(prefs.instant_task_assigned);
        assert!(prefs.instant_comment);
        assert!(prefs.instant_team_invite);
        assert!(prefs.deadline_reminders);
        assert_eq!(prefs.digest_frequency, DigestFrequency::Weekly);
    }

    #[test]
    fn test_digest_frequency_parse() {
        assert_eq!("daily".parse::<DigestFrequency>(), Ok(DigestFrequency::Daily));
        assert_eq!("off".parse::<DigestFrequency>(), Ok(DigestFrequency::Off));
        assert!("monthly".parse::<DigestFrequency>().is_err());
        assert_eq!(DigestFrequency::Weekly.as_str(), "weekly");
    }
}
