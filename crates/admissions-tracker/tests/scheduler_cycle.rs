//! Scheduled notification cycles exercised through the public facade:
//! repeat runs deduplicate, urgency escalation re-notifies once, and the
//! same deadline is never claimed by both the reminder and overdue tasks.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use admissions_tracker::clock::FixedClock;
    use admissions_tracker::tracking::{
        ApplicationDetail, ApplicationTrack, InMemoryTrackerStore, NewApplication,
        Notification, NotificationQuery, RetentionPolicy, StudentId, TrackerService,
    };

    pub(super) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).single().expect("valid instant")
    }

    pub(super) fn student() -> StudentId {
        StudentId("student-7".to_string())
    }

    pub(super) fn service_at(
        store: &Arc<InMemoryTrackerStore>,
        instant: DateTime<Utc>,
    ) -> TrackerService<InMemoryTrackerStore, FixedClock> {
        TrackerService::new(
            store.clone(),
            Arc::new(FixedClock(instant)),
            RetentionPolicy::default(),
        )
    }

    /// Creates an application 30 days out. The standard checklist puts the
    /// recommendation deadline 28 days before that, so exactly one item
    /// sits two days away while everything else stays outside the alert
    /// horizon.
    pub(super) fn create_application(
        service: &TrackerService<InMemoryTrackerStore, FixedClock>,
    ) -> ApplicationDetail {
        service
            .create_application(NewApplication {
                student_id: student(),
                university: "Iowa State University".to_string(),
                track: ApplicationTrack::Regular,
                deadline: now() + Duration::days(30),
            })
            .expect("application creates")
    }

    pub(super) fn notifications(
        service: &TrackerService<InMemoryTrackerStore, FixedClock>,
    ) -> Vec<Notification> {
        service
            .notifications(&student(), NotificationQuery::default())
            .expect("notification listing succeeds")
    }
}

use std::sync::Arc;

use chrono::Duration;

use admissions_tracker::tracking::{
    InMemoryTrackerStore, NotificationKind, ScheduledTask, TaskOutcome, UrgencyTier,
};

use common::*;

fn created_count(outcome: &Option<TaskOutcome>) -> usize {
    match outcome {
        Some(TaskOutcome::Completed { report }) => report.created,
        other => panic!("expected a completed task, got {other:?}"),
    }
}

#[test]
fn repeat_runs_deduplicate() {
    let store = Arc::new(InMemoryTrackerStore::default());
    let service = service_at(&store, now());
    create_application(&service);

    let first = service.run_scheduled_tasks(ScheduledTask::All);
    assert_eq!(created_count(&first.deadline_reminders), 1);
    assert_eq!(created_count(&first.overdue_deadlines), 0);

    let second = service.run_scheduled_tasks(ScheduledTask::All);
    assert_eq!(created_count(&second.deadline_reminders), 0);
    assert_eq!(notifications(&service).len(), 1);
}

#[test]
fn escalation_renotifies_once_then_hands_off_to_overdue() {
    let store = Arc::new(InMemoryTrackerStore::default());
    let early = service_at(&store, now());
    create_application(&early);

    // Two days out: one warning-tier reminder.
    early.run_scheduled_tasks(ScheduledTask::All);
    assert_eq!(notifications(&early).len(), 1);

    // On the deadline day the same item is critical, a fresh dedup key.
    let due_day = service_at(&store, now() + Duration::days(2));
    let report = due_day.run_scheduled_tasks(ScheduledTask::All);
    assert_eq!(created_count(&report.deadline_reminders), 1);
    assert_eq!(created_count(&report.overdue_deadlines), 0);

    // One day past, the reminder task lets go and the overdue task claims it.
    let past = service_at(&store, now() + Duration::days(3));
    let report = past.run_scheduled_tasks(ScheduledTask::All);
    assert_eq!(created_count(&report.deadline_reminders), 0);
    assert_eq!(created_count(&report.overdue_deadlines), 1);

    let all = notifications(&past);
    assert_eq!(all.len(), 3);
    let reminders: Vec<_> = all
        .iter()
        .filter(|n| n.kind == NotificationKind::DeadlineReminder)
        .collect();
    assert_eq!(reminders.len(), 2);
    assert!(reminders.iter().any(|n| n.tier == UrgencyTier::Warning));
    assert!(reminders.iter().any(|n| n.tier == UrgencyTier::Critical));
    assert_eq!(
        all.iter()
            .filter(|n| n.kind == NotificationKind::Overdue)
            .count(),
        1
    );
}

#[test]
fn completed_requirements_stop_notifying() {
    use admissions_tracker::tracking::{
        RequirementCategory, RequirementStatus, RequirementUpdate,
    };

    let store = Arc::new(InMemoryTrackerStore::default());
    let service = service_at(&store, now());
    let detail = create_application(&service);

    let recommendation = detail
        .requirements
        .iter()
        .find(|requirement| requirement.category == RequirementCategory::Recommendation)
        .expect("recommendation requirement seeded");
    service
        .update_requirement(
            &recommendation.id,
            &student(),
            RequirementUpdate {
                status: Some(RequirementStatus::Completed),
                notes: None,
            },
        )
        .expect("requirement updates");

    let report = service.run_scheduled_tasks(ScheduledTask::All);
    assert_eq!(created_count(&report.deadline_reminders), 0);
    assert!(notifications(&service).is_empty());
}
