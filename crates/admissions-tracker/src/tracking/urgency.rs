use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How urgent a deadline is, derived from signed days-until.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Info,
    Warning,
    Critical,
}

impl UrgencyTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

/// Deadlines further out than this are never surfaced as alerts.
pub const ALERT_HORIZON_DAYS: i64 = 7;
/// Upper bound of the warning band; due today or overdue is critical.
pub const WARNING_HORIZON_DAYS: i64 = 3;

/// Fixed-policy tier mapping. Negative days mean the deadline has passed.
/// Returns `None` beyond the alert horizon so callers drop the item
/// entirely rather than rendering a harmless-looking tier.
pub const fn classify(days_until: i64) -> Option<UrgencyTier> {
    if days_until <= 0 {
        Some(UrgencyTier::Critical)
    } else if days_until <= WARNING_HORIZON_DAYS {
        Some(UrgencyTier::Warning)
    } else if days_until <= ALERT_HORIZON_DAYS {
        Some(UrgencyTier::Info)
    } else {
        None
    }
}

/// Whole days from `today` until the deadline's calendar date. A deadline
/// later today is 0 days out, yesterday is -1.
pub fn days_until(deadline: DateTime<Utc>, today: NaiveDate) -> i64 {
    deadline
        .date_naive()
        .signed_duration_since(today)
        .num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn boundary_days_map_to_exact_tiers() {
        assert_eq!(classify(-5), Some(UrgencyTier::Critical));
        assert_eq!(classify(0), Some(UrgencyTier::Critical));
        assert_eq!(classify(1), Some(UrgencyTier::Warning));
        assert_eq!(classify(3), Some(UrgencyTier::Warning));
        assert_eq!(classify(4), Some(UrgencyTier::Info));
        assert_eq!(classify(7), Some(UrgencyTier::Info));
        assert_eq!(classify(8), None);
    }

    #[test]
    fn days_until_uses_calendar_dates_not_instants() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let late_tonight = Utc.with_ymd_and_hms(2026, 2, 1, 23, 59, 59).unwrap();
        assert_eq!(days_until(late_tonight, today), 0);

        let next_week = Utc.with_ymd_and_hms(2026, 2, 8, 0, 0, 0).unwrap();
        assert_eq!(days_until(next_week, today), 7);

        let yesterday = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(days_until(yesterday, today), -1);
    }
}
