/// Digest emails
///
/// One run walks every subscriber of the due periods and mails them the
/// tasks assigned to them that were created inside the period's window.
/// Users with nothing new get no email, and a failure for one user is
/// logged without stopping the batch.

use chrono::{DateTime, Utc};
use glacier_shared::email::{EmailTemplates, Mailer, OutgoingEmail};
use glacier_shared::models::email_preference::{DigestRecipient, EmailPreferences};
use glacier_shared::models::task::Task;
use sqlx::PgPool;
use std::sync::Arc;

use crate::schedule::DigestPeriod;

/// Errors for a single recipient
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Mail error: {0}")]
    Mail(#[from] glacier_shared::email::MailError),
}

/// Counts from one digest pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DigestReport {
    pub sent: usize,

    /// Subscribers with no matching tasks
    pub skipped: usize,
    pub failed: usize,
}

impl DigestReport {
    fn merge(&mut self, other: DigestReport) {
        self.sent += other.sent;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub fn digest_subject(app_name: &str, period: DigestPeriod) -> String {
    format!("{} — {} Digest", app_name, period.label())
}

/// Sends digest emails
#[derive(Clone)]
pub struct DigestSender {
    db: PgPool,
    mailer: Arc<dyn Mailer>,
    templates: Arc<EmailTemplates>,
}

impl DigestSender {
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>, templates: EmailTemplates) -> Self {
        Self {
            db,
            mailer,
            templates: Arc::new(templates),
        }
    }

    /// Sends every period in `periods` for a run at `now`
    ///
    /// # Errors
    ///
    /// Fails only when a recipient list cannot be loaded; per-user failures
    /// are counted in the report.
    pub async fn run(
        &self,
        periods: &[DigestPeriod],
        now: DateTime<Utc>,
    ) -> Result<DigestReport, sqlx::Error> {
        let mut report = DigestReport::default();

        for &period in periods {
            let period_report = self.send_period(period, now).await?;

            tracing::info!(
                period = period.label(),
                sent = period_report.sent,
                skipped = period_report.skipped,
                failed = period_report.failed,
                "Digest pass finished"
            );

            report.merge(period_report);
        }

        Ok(report)
    }

    pub async fn send_period(
        &self,
        period: DigestPeriod,
        now: DateTime<Utc>,
    ) -> Result<DigestReport, sqlx::Error> {
        let recipients = EmailPreferences::digest_recipients(&self.db, period.frequency()).await?;
        let since = now - period.lookback();
        let mut report = DigestReport::default();

        for recipient in recipients {
            match self.send_one(&recipient, period, since).await {
                Ok(true) => report.sent += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        user_id = recipient.id,
                        period = period.label(),
                        error = %e,
                        "Digest failed for user"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Returns whether an email went out
    async fn send_one(
        &self,
        recipient: &DigestRecipient,
        period: DigestPeriod,
        since: DateTime<Utc>,
    ) -> Result<bool, DigestError> {
        let items = Task::digest_items(&self.db, recipient.id, since).await?;
        if items.is_empty() {
            return Ok(false);
        }

        self.mailer
            .send(OutgoingEmail {
                to: recipient.email.clone(),
                subject: digest_subject(self.templates.app_name(), period),
                body: self.templates.digest(period.label(), &items),
            })
            .await?;

        tracing::debug!(user_id = recipient.id, items = items.len(), "Digest sent");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject() {
        assert_eq!(digest_subject("Glacier", DigestPeriod::Daily), "Glacier — Daily Digest");
        assert_eq!(digest_subject("Glacier", DigestPeriod::Weekly), "Glacier — Weekly Digest");
    }

    #[test]
    fn test_report_merge() {
        let mut total = DigestReport { sent: 1, skipped: 2, failed: 0 };
        total.merge(DigestReport { sent: 3, skipped: 0, failed: 1 });
        assert_eq!(total, DigestReport { sent: 4, skipped: 2, failed: 1 });
    }
}
