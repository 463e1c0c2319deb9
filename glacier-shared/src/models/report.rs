/// Team task summary for the reports page
///
/// Every aggregate runs over the same base set: the team's tasks, optionally
/// bounded by `created_at` (inclusive `from` day start, inclusive `to` day end).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PriorityCount {
    pub priority: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DayCount {
    /// `YYYY-MM-DD`
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AssigneeCount {
    pub assignee_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub by_status: Vec<StatusCount>,
    pub by_priority: Vec<PriorityCount>,
    pub completed_by_day: Vec<DayCount>,
    pub created_by_day: Vec<DayCount>,
    pub assignee_counts: Vec<AssigneeCount>,
}

/// `created_at` bounds; either side may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Turns calendar days into an inclusive instant range
    pub fn from_days(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);

        Self {
            from: from.map(|d| d.and_time(NaiveTime::MIN).and_utc()),
            to: to.map(|d| d.and_time(end_of_day).and_utc()),
        }
    }
}

const BASE: &str = r#"
    FROM tasks t
    WHERE t.team_id = $1
      AND ($2::timestamptz IS NULL OR t.created_at >= $2)
      AND ($3::timestamptz IS NULL OR t.created_at <= $3)
"#;

impl TeamSummary {
    /// Computes all aggregates for a team
    pub async fn compute(pool: &PgPool, team_id: i32, range: DateRange) -> Result<Self, sqlx::Error> {
        let by_status = sqlx::query_as::<_, StatusCount>(&format!(
            "SELECT t.status::text AS status, COUNT(*) AS count {BASE} GROUP BY t.status"
        ))
        .bind(team_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await?;

        let by_priority = sqlx::query_as::<_, PriorityCount>(&format!(
            "SELECT t.priority::text AS priority, COUNT(*) AS count {BASE} GROUP BY t.priority"
        ))
        .bind(team_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await?;

        let completed_by_day = sqlx::query_as::<_, DayCount>(&format!(
            r#"
            SELECT to_char(date_trunc('day', t.updated_at), 'YYYY-MM-DD') AS day, COUNT(*) AS count
            {BASE}
              AND t.status = 'completed'
            GROUP BY day
            ORDER BY day ASC
            "#
        ))
        .bind(team_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await?;

        let created_by_day = sqlx::query_as::<_, DayCount>(&format!(
            r#"
            SELECT to_char(date_trunc('day', t.created_at), 'YYYY-MM-DD') AS day, COUNT(*) AS count
            {BASE}
            GROUP BY day
            ORDER BY day ASC
            "#
        ))
        .bind(team_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await?;

        let assignee_counts = sqlx::query_as::<_, AssigneeCount>(
            r#"
            SELECT COALESCE(u.name, 'Unassigned') AS assignee_name, COUNT(*) AS count
            FROM tasks t
            LEFT JOIN users u ON u.id = t.assigned_to
            WHERE t.team_id = $1
              AND ($2::timestamptz IS NULL OR t.created_at >= $2)
              AND ($3::timestamptz IS NULL OR t.created_at <= $3)
            GROUP BY assignee_name
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .bind(team_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await?;

        Ok(Self {
            by_status,
            by_priority,
            completed_by_day,
            created_by_day,
            assignee_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_date_range_covers_whole_days() {
        let range = DateRange::from_days(
            NaiveDate::from_ymd_opt(2025, 3, 1),
            NaiveDate::from_ymd_opt(2025, 3, 31),
        );

        let from = range.from.unwrap();
        let to = range.to.unwrap();
        assert_eq!(from.hour(), 0);
        assert_eq!(to.hour(), 23);
        assert_eq!(to.minute(), 59);
        assert_eq!(to.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }

    #[test]
    fn test_open_date_range() {
        assert_eq!(DateRange::from_days(None, None), DateRange::default());
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = TeamSummary {
            by_status: vec![StatusCount {
                status: "pending".to_string(),
                count: 2,
            }],
            by_priority: vec![],
            completed_by_day: vec![],
            created_by_day: vec![],
            assignee_counts: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["byStatus"][0]["count"], 2);
        assert!(json.get("assigneeCounts").is_some());
    }
}
