use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{ApplicationRequirement, RequirementStatus};
use super::urgency::days_until;

/// Aggregate completion figures for one application's requirements.
/// Consumed by the UI surfaces and by the auto-transition policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequirementProgress {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    /// Non-completed requirements whose own deadline is strictly past.
    pub overdue: usize,
    /// `round(completed / total * 100)`; 0 when there are no requirements.
    pub completion_percentage: u8,
}

impl RequirementProgress {
    pub const fn empty() -> Self {
        Self {
            total: 0,
            completed: 0,
            in_progress: 0,
            not_started: 0,
            overdue: 0,
            completion_percentage: 0,
        }
    }

    pub fn all_completed(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    pub fn any_underway(&self) -> bool {
        self.in_progress + self.completed > 0
    }
}

/// Pure aggregation over the supplied requirement records.
pub fn summarize(requirements: &[ApplicationRequirement], today: NaiveDate) -> RequirementProgress {
    let mut progress = RequirementProgress::empty();
    progress.total = requirements.len();

    for requirement in requirements {
        match requirement.status {
            RequirementStatus::Completed => progress.completed += 1,
            RequirementStatus::InProgress => progress.in_progress += 1,
            RequirementStatus::NotStarted => progress.not_started += 1,
        }

        if requirement.status != RequirementStatus::Completed {
            if let Some(deadline) = requirement.deadline {
                if days_until(deadline, today) < 0 {
                    progress.overdue += 1;
                }
            }
        }
    }

    if progress.total > 0 {
        let ratio = progress.completed as f64 / progress.total as f64;
        progress.completion_percentage = (ratio * 100.0).round() as u8;
    }

    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::domain::{ApplicationId, RequirementCategory, RequirementId};
    use chrono::{TimeZone, Utc};

    fn requirement(
        n: u32,
        status: RequirementStatus,
        deadline: Option<chrono::DateTime<Utc>>,
    ) -> ApplicationRequirement {
        ApplicationRequirement {
            id: RequirementId(format!("req-{n}")),
            application_id: ApplicationId("app-1".to_string()),
            category: RequirementCategory::Essay,
            title: format!("Requirement {n}"),
            status,
            deadline,
            notes: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    #[test]
    fn empty_set_is_all_zeros() {
        let progress = summarize(&[], today());
        assert_eq!(progress, RequirementProgress::empty());
        assert_eq!(progress.completion_percentage, 0);
        assert!(!progress.all_completed());
        assert!(!progress.any_underway());
    }

    #[test]
    fn counts_statuses_and_rounds_percentage() {
        let requirements = vec![
            requirement(1, RequirementStatus::Completed, None),
            requirement(2, RequirementStatus::InProgress, None),
            requirement(3, RequirementStatus::NotStarted, None),
        ];
        let progress = summarize(&requirements, today());
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.in_progress, 1);
        assert_eq!(progress.not_started, 1);
        // 1/3 rounds to 33, not truncated from 33.33 to anything else.
        assert_eq!(progress.completion_percentage, 33);
        assert!(progress.any_underway());
    }

    #[test]
    fn overdue_counts_only_past_deadline_incomplete_items() {
        let past = Utc.with_ymd_and_hms(2026, 2, 9, 9, 0, 0).unwrap();
        let due_today = Utc.with_ymd_and_hms(2026, 2, 10, 23, 0, 0).unwrap();
        let requirements = vec![
            requirement(1, RequirementStatus::NotStarted, Some(past)),
            requirement(2, RequirementStatus::Completed, Some(past)),
            requirement(3, RequirementStatus::InProgress, Some(due_today)),
            requirement(4, RequirementStatus::InProgress, None),
        ];
        let progress = summarize(&requirements, today());
        // Completed-but-late and due-today items are not overdue.
        assert_eq!(progress.overdue, 1);
    }

    #[test]
    fn full_completion_reports_one_hundred_percent() {
        let requirements = vec![
            requirement(1, RequirementStatus::Completed, None),
            requirement(2, RequirementStatus::Completed, None),
        ];
        let progress = summarize(&requirements, today());
        assert_eq!(progress.completion_percentage, 100);
        assert!(progress.all_completed());
    }
}
