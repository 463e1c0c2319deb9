/// Digest schedule
///
/// Digests run once a day at a fixed local hour. Daily subscribers get
/// mail every run; weekly subscribers only on Mondays.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use glacier_shared::models::email_preference::DigestFrequency;

/// Which digest a run sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestPeriod {
    Daily,
    Weekly,
}

impl DigestPeriod {
    /// Periods due on a given weekday, daily first
    pub fn due_on(weekday: Weekday) -> &'static [DigestPeriod] {
        if weekday == Weekday::Mon {
            &[DigestPeriod::Daily, DigestPeriod::Weekly]
        } else {
            &[DigestPeriod::Daily]
        }
    }

    pub fn frequency(&self) -> DigestFrequency {
        match self {
            DigestPeriod::Daily => DigestFrequency::Daily,
            DigestPeriod::Weekly => DigestFrequency::Weekly,
        }
    }

    /// How far back a digest of this period looks
    pub fn lookback(&self) -> Duration {
        match self {
            DigestPeriod::Daily => Duration::days(1),
            DigestPeriod::Weekly => Duration::days(7),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DigestPeriod::Daily => "Daily",
            DigestPeriod::Weekly => "Weekly",
        }
    }
}

/// `hour:00` on `date` in `tz`
///
/// When the hour falls in a DST gap the first valid instant after it is
/// used.
fn at_hour<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Tz>> {
    let mut naive = date.and_hms_opt(hour, 0, 0)?;

    for _ in 0..3 {
        if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
            return Some(instant);
        }
        naive += Duration::hours(1);
    }

    None
}

/// First `hour:00` strictly after `now`
///
/// A run scheduled for exactly `now` is considered past, so a loop that
/// wakes on time never fires twice.
pub fn next_run_at<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();

    match at_hour(&tz, today, hour) {
        Some(candidate) if candidate > *now => Some(candidate),
        _ => at_hour(&tz, today.succ_opt()?, hour),
    }
}

/// Periods due for a run that fires at `at`, judged by its local weekday
pub fn periods_for<Tz: TimeZone>(at: &DateTime<Tz>) -> &'static [DigestPeriod] {
    DigestPeriod::due_on(at.weekday())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 6, 30, 0).unwrap();
        let next = next_run_at(&now, 8).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap();
        let next = next_run_at(&now, 8).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 7, 8, 0, 0).unwrap());

        let late = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        let next = next_run_at(&late, 8).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap();
        let next = next_run_at(&now, 8).unwrap();
        assert_eq!(next.naive_local().to_string(), "2024-05-06 08:00:00");
    }

    #[test]
    fn test_weekly_only_on_monday() {
        let monday = Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2024, 5, 7, 8, 0, 0).unwrap();

        assert_eq!(periods_for(&monday), &[DigestPeriod::Daily, DigestPeriod::Weekly]);
        assert_eq!(periods_for(&tuesday), &[DigestPeriod::Daily]);
    }

    #[test]
    fn test_period_windows() {
        assert_eq!(DigestPeriod::Daily.lookback(), Duration::days(1));
        assert_eq!(DigestPeriod::Weekly.lookback(), Duration::days(7));
        assert_eq!(DigestPeriod::Weekly.frequency(), DigestFrequency::Weekly);
    }
}
