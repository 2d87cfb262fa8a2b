use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;

use super::domain::{AlertSource, ApplicationStatus, RequirementStatus, StudentId};
use super::store::{ApplicationStore, RequirementStore, StoreError};
use super::urgency::{classify, days_until, UrgencyTier};

/// Transient view of one upcoming or missed deadline. Never persisted;
/// recomputed from current store state on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadlineAlert {
    pub source: AlertSource,
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub tier: UrgencyTier,
    pub days_until: i64,
    pub student_id: StudentId,
}

/// Merged alert list for one student plus per-tier counts.
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub alerts: Vec<DeadlineAlert>,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

/// Combines application and requirement deadlines into one time-ordered
/// alert list. Stateless by design so every call reflects the latest
/// requirement edits.
pub struct DeadlineAlertAggregator<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> DeadlineAlertAggregator<S, C>
where
    S: ApplicationStore + RequirementStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Every non-decided application with a deadline inside `window_days`,
    /// and (optionally) every incomplete requirement with its own
    /// in-window deadline, classified and sorted ascending by deadline.
    /// Deadlines past the classifier's horizon are dropped outright.
    pub fn collect(
        &self,
        student: &StudentId,
        window_days: i64,
        include_requirements: bool,
    ) -> Result<AlertSummary, StoreError> {
        let today = self.clock.today();
        let mut alerts = Vec::new();

        for application in self.store.applications_for(student)? {
            if application.status == ApplicationStatus::Decided {
                continue;
            }

            let days = days_until(application.deadline, today);
            if days <= window_days {
                if let Some(tier) = classify(days) {
                    alerts.push(DeadlineAlert {
                        source: AlertSource::Application(application.id.clone()),
                        title: application.university.clone(),
                        deadline: application.deadline,
                        tier,
                        days_until: days,
                        student_id: student.clone(),
                    });
                }
            }

            if !include_requirements {
                continue;
            }

            for requirement in self.store.requirements_for(&application.id)? {
                if requirement.status == RequirementStatus::Completed {
                    continue;
                }
                let Some(deadline) = requirement.deadline else {
                    continue;
                };
                let days = days_until(deadline, today);
                if days > window_days {
                    continue;
                }
                if let Some(tier) = classify(days) {
                    alerts.push(DeadlineAlert {
                        source: AlertSource::Requirement(requirement.id.clone()),
                        title: requirement.title.clone(),
                        deadline,
                        tier,
                        days_until: days,
                        student_id: student.clone(),
                    });
                }
            }
        }

        alerts.sort_by(|a, b| a.deadline.cmp(&b.deadline));

        let count = |tier: UrgencyTier| alerts.iter().filter(|alert| alert.tier == tier).count();
        Ok(AlertSummary {
            critical: count(UrgencyTier::Critical),
            warning: count(UrgencyTier::Warning),
            info: count(UrgencyTier::Info),
            alerts,
        })
    }
}
