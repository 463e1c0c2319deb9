/// Digest runs against a real database
///
/// Run with: cargo test --test digest_tests -- --test-threads=1

mod common;

use chrono::{Duration, Utc};
use common::{RecordingMailer, TestContext};
use glacier_shared::email::EmailTemplates;
use glacier_shared::models::email_preference::DigestFrequency;
use glacier_worker::digest::DigestSender;
use glacier_worker::runner::purge_sessions;
use glacier_worker::schedule::DigestPeriod;
use std::sync::Arc;

fn sender(ctx: &TestContext, mailer: Arc<RecordingMailer>) -> DigestSender {
    DigestSender::new(
        ctx.pool.clone(),
        mailer,
        EmailTemplates::new("Glacier", "http://localhost:5173"),
    )
}

#[tokio::test]
async fn test_daily_digest_goes_to_daily_subscribers_with_tasks() {
    let ctx = TestContext::new().await;
    let lead = ctx.user("Lead", None).await;
    let daily = ctx.user("Daily", Some(DigestFrequency::Daily)).await;
    let weekly = ctx.user("Weekly", Some(DigestFrequency::Weekly)).await;
    let idle = ctx.user("Idle", Some(DigestFrequency::Daily)).await;

    let team = ctx.team(&lead).await;
    let task = ctx.assigned_task(&team, &lead, &daily).await;
    ctx.assigned_task(&team, &lead, &weekly).await;

    let mailer = Arc::new(RecordingMailer::default());
    sender(&ctx, mailer.clone())
        .send_period(DigestPeriod::Daily, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();

    let received = mailer.sent_to(&daily.email);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].subject, "Glacier — Daily Digest");
    assert!(received[0].body.text.contains(&task.title));
    assert!(received[0].body.text.contains("(pending, high)"));

    assert!(mailer.sent_to(&weekly.email).is_empty());
    assert!(mailer.sent_to(&idle.email).is_empty());
}

#[tokio::test]
async fn test_monday_run_includes_weekly_subscribers() {
    let ctx = TestContext::new().await;
    let lead = ctx.user("Lead", None).await;
    let weekly = ctx.user("Weekly", Some(DigestFrequency::Weekly)).await;

    let team = ctx.team(&lead).await;
    ctx.assigned_task(&team, &lead, &weekly).await;

    let mailer = Arc::new(RecordingMailer::default());
    sender(&ctx, mailer.clone())
        .run(
            DigestPeriod::due_on(chrono::Weekday::Mon),
            Utc::now() + Duration::seconds(1),
        )
        .await
        .unwrap();

    let received = mailer.sent_to(&weekly.email);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].subject, "Glacier — Weekly Digest");
}

#[tokio::test]
async fn test_tasks_outside_window_are_left_out() {
    let ctx = TestContext::new().await;
    let lead = ctx.user("Lead", None).await;
    let daily = ctx.user("Daily", Some(DigestFrequency::Daily)).await;

    let team = ctx.team(&lead).await;
    ctx.assigned_task(&team, &lead, &daily).await;

    let mailer = Arc::new(RecordingMailer::default());
    sender(&ctx, mailer.clone())
        .send_period(DigestPeriod::Daily, Utc::now() + Duration::days(2))
        .await
        .unwrap();

    assert!(mailer.sent_to(&daily.email).is_empty());
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_batch() {
    let ctx = TestContext::new().await;
    let lead = ctx.user("Lead", None).await;
    let broken = ctx.user("Broken", Some(DigestFrequency::Daily)).await;
    let fine = ctx.user("Fine", Some(DigestFrequency::Daily)).await;

    let team = ctx.team(&lead).await;
    ctx.assigned_task(&team, &lead, &broken).await;
    ctx.assigned_task(&team, &lead, &fine).await;

    let mailer = Arc::new(RecordingMailer {
        reject: vec![broken.email.clone()],
        ..Default::default()
    });

    let report = sender(&ctx, mailer.clone())
        .send_period(DigestPeriod::Daily, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();

    assert!(report.failed >= 1);
    assert_eq!(mailer.sent_to(&fine.email).len(), 1);
}

#[tokio::test]
async fn test_purge_removes_only_expired_sessions() {
    use glacier_shared::auth::session::hash_session_token;
    use glacier_shared::models::session::Session;

    let ctx = TestContext::new().await;
    let user = ctx.user("Sleeper", None).await;

    let live = hash_session_token(&common::unique("live"));
    let stale = hash_session_token(&common::unique("stale"));
    Session::create(&ctx.pool, user.id, &live, Duration::hours(1)).await.unwrap();
    Session::create(&ctx.pool, user.id, &stale, Duration::seconds(-1)).await.unwrap();

    let removed = purge_sessions(&ctx.pool).await.unwrap();
    assert!(removed >= 1);

    assert!(Session::find_user(&ctx.pool, &live).await.unwrap().is_some());
    assert!(Session::find_user(&ctx.pool, &stale).await.unwrap().is_none());
}
