/// Integration tests for database migrations
///
/// These tests require a running PostgreSQL database.
/// Run with: cargo test --test db_migrations_tests -- --test-threads=1

mod common;

use common::TestContext;
use glacier_shared::db::migrations::{get_migration_status, run_migrations};

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let ctx = TestContext::new().await;

    let before = get_migration_status(&ctx.pool).await.expect("Failed to get status");
    run_migrations(&ctx.pool).await.expect("Second migration run failed");
    let after = get_migration_status(&ctx.pool).await.expect("Failed to get status");

    assert_eq!(before.applied_migrations, after.applied_migrations);
    assert!(after.latest_version.is_some());
}

#[tokio::test]
async fn test_migration_creates_all_tables() {
    let ctx = TestContext::new().await;

    let expected_tables = [
        "users",
        "sessions",
        "teams",
        "team_members",
        "team_invitations",
        "tasks",
        "task_comments",
        "task_activity",
        "task_attachments",
        "labels",
        "task_labels",
        "sub_tasks",
        "time_entries",
        "notifications",
        "user_email_preferences",
        "chat_messages",
    ];

    for table_name in expected_tables {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public'
                AND table_name = $1
            )",
        )
        .bind(table_name)
        .fetch_one(&ctx.pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to check for table {}: {}", table_name, e));

        assert!(exists, "Table '{}' should exist after migrations", table_name);
    }
}

#[tokio::test]
async fn test_migration_creates_enums() {
    let ctx = TestContext::new().await;

    let expected_enums = [
        "team_role",
        "invitation_status",
        "task_status",
        "task_priority",
        "digest_frequency",
        "chat_message_type",
    ];

    for enum_name in expected_enums {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT FROM pg_type WHERE typname = $1)")
            .bind(enum_name)
            .fetch_one(&ctx.pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to check for enum {}: {}", enum_name, e));

        assert!(exists, "Enum '{}' should exist after migrations", enum_name);
    }
}
