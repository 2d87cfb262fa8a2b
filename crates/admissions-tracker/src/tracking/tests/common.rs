use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::clock::FixedClock;
use crate::tracking::domain::{
    Actor, AlertSource, Application, ApplicationId, ApplicationRequirement, ApplicationStatus,
    ApplicationTrack, Notification, NotificationId, RequirementCategory, RequirementId,
    RequirementStatus, StatusHistoryEntry, StudentId,
};
use crate::tracking::memory::InMemoryTrackerStore;
use crate::tracking::scheduler::RetentionPolicy;
use crate::tracking::service::TrackerService;
use crate::tracking::status::next_history_id;
use crate::tracking::store::{
    ApplicationStore, DedupOutcome, HistoryStore, NotificationQuery, NotificationStore,
    RequirementStore, StoreError,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid instant")
}

pub(super) fn days_from_now(days: i64) -> DateTime<Utc> {
    now() + Duration::days(days)
}

pub(super) fn student() -> StudentId {
    StudentId("student-1".to_string())
}

pub(super) fn build_service() -> (
    Arc<TrackerService<InMemoryTrackerStore, FixedClock>>,
    Arc<InMemoryTrackerStore>,
    Arc<FixedClock>,
) {
    build_service_at(now())
}

pub(super) fn build_service_at(
    instant: DateTime<Utc>,
) -> (
    Arc<TrackerService<InMemoryTrackerStore, FixedClock>>,
    Arc<InMemoryTrackerStore>,
    Arc<FixedClock>,
) {
    let store = Arc::new(InMemoryTrackerStore::default());
    let clock = Arc::new(FixedClock(instant));
    let service = Arc::new(TrackerService::new(
        store.clone(),
        clock.clone(),
        RetentionPolicy::default(),
    ));
    (service, store, clock)
}

pub(super) const TRIGGER_SECRET: &str = "trigger-secret";

pub(super) fn test_router(
    service: Arc<TrackerService<InMemoryTrackerStore, FixedClock>>,
) -> axum::Router {
    crate::tracking::router::tracker_router(service, TRIGGER_SECRET)
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

static TEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn unique(prefix: &str) -> String {
    let id = TEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-t{id:04}")
}

/// Inserts an application directly, bypassing the checklist template so
/// tests control the exact requirement set, and writes the seed history
/// entry the service would have written.
pub(super) fn seed_application(
    store: &InMemoryTrackerStore,
    student: &StudentId,
    university: &str,
    deadline: DateTime<Utc>,
) -> Application {
    let application = Application {
        id: ApplicationId(unique("app")),
        student_id: student.clone(),
        university: university.to_string(),
        track: ApplicationTrack::Regular,
        status: ApplicationStatus::NotStarted,
        deadline,
        decision: None,
        submission_confirmed: false,
        created_at: now(),
        updated_at: now(),
    };
    let application = store
        .insert_application(application)
        .expect("application inserts");
    store
        .append_history(StatusHistoryEntry {
            id: next_history_id(),
            application_id: application.id.clone(),
            from_status: None,
            to_status: ApplicationStatus::NotStarted,
            actor: Actor::Student(student.clone()),
            notes: None,
            recorded_at: now(),
        })
        .expect("seed history appends");
    application
}

pub(super) fn seed_requirement(
    store: &InMemoryTrackerStore,
    application: &Application,
    title: &str,
    status: RequirementStatus,
    deadline: Option<DateTime<Utc>>,
) -> ApplicationRequirement {
    store
        .insert_requirement(ApplicationRequirement {
            id: RequirementId(unique("req")),
            application_id: application.id.clone(),
            category: RequirementCategory::Essay,
            title: title.to_string(),
            status,
            deadline,
            notes: None,
        })
        .expect("requirement inserts")
}

pub(super) fn set_requirement_status(
    store: &InMemoryTrackerStore,
    requirement: &ApplicationRequirement,
    status: RequirementStatus,
) {
    let mut updated = requirement.clone();
    updated.status = status;
    store.update_requirement(updated).expect("requirement updates");
}

/// Store fake whose every call fails as unreachable, for exercising the
/// scheduler's whole-task failure path.
pub(super) struct UnavailableStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl ApplicationStore for UnavailableStore {
    fn insert_application(&self, _application: Application) -> Result<Application, StoreError> {
        unavailable()
    }

    fn application(&self, _id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        unavailable()
    }

    fn delete_application(&self, _id: &ApplicationId) -> Result<(), StoreError> {
        unavailable()
    }

    fn applications_for(&self, _student: &StudentId) -> Result<Vec<Application>, StoreError> {
        unavailable()
    }

    fn confirm_submission(&self, _id: &ApplicationId, _at: DateTime<Utc>) -> Result<(), StoreError> {
        unavailable()
    }

    fn students_with_open_applications(&self) -> Result<Vec<StudentId>, StoreError> {
        unavailable()
    }

    fn apply_transition(
        &self,
        _id: &ApplicationId,
        _expected_from: ApplicationStatus,
        _to: ApplicationStatus,
        _entry: StatusHistoryEntry,
    ) -> Result<Application, StoreError> {
        unavailable()
    }
}

impl RequirementStore for UnavailableStore {
    fn insert_requirement(
        &self,
        _requirement: ApplicationRequirement,
    ) -> Result<ApplicationRequirement, StoreError> {
        unavailable()
    }

    fn requirement(
        &self,
        _id: &RequirementId,
    ) -> Result<Option<ApplicationRequirement>, StoreError> {
        unavailable()
    }

    fn update_requirement(&self, _requirement: ApplicationRequirement) -> Result<(), StoreError> {
        unavailable()
    }

    fn requirements_for(
        &self,
        _application: &ApplicationId,
    ) -> Result<Vec<ApplicationRequirement>, StoreError> {
        unavailable()
    }

    fn delete_requirements_for(
        &self,
        _application: &ApplicationId,
    ) -> Result<Vec<RequirementId>, StoreError> {
        unavailable()
    }
}

impl HistoryStore for UnavailableStore {
    fn append_history(&self, _entry: StatusHistoryEntry) -> Result<(), StoreError> {
        unavailable()
    }

    fn history_for(
        &self,
        _application: &ApplicationId,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        unavailable()
    }

    fn recent_history_for(
        &self,
        _student: &StudentId,
        _limit: usize,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        unavailable()
    }

    fn delete_history_for(&self, _application: &ApplicationId) -> Result<(), StoreError> {
        unavailable()
    }
}

impl NotificationStore for UnavailableStore {
    fn create_if_absent(&self, _notification: Notification) -> Result<DedupOutcome, StoreError> {
        unavailable()
    }

    fn notification(&self, _id: &NotificationId) -> Result<Option<Notification>, StoreError> {
        unavailable()
    }

    fn notifications_for(
        &self,
        _recipient: &StudentId,
        _query: NotificationQuery,
    ) -> Result<Vec<Notification>, StoreError> {
        unavailable()
    }

    fn mark_notification_read(&self, _id: &NotificationId) -> Result<Notification, StoreError> {
        unavailable()
    }

    fn delete_notification(&self, _id: &NotificationId) -> Result<(), StoreError> {
        unavailable()
    }

    fn purge_read_before(&self, _cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        unavailable()
    }

    fn purge_unread_before(&self, _cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        unavailable()
    }

    fn delete_notifications_for_sources(
        &self,
        _sources: &[AlertSource],
    ) -> Result<usize, StoreError> {
        unavailable()
    }
}

pub(super) fn all_notifications(
    store: &InMemoryTrackerStore,
    recipient: &StudentId,
) -> Vec<Notification> {
    store
        .notifications_for(recipient, NotificationQuery::default())
        .expect("notification listing succeeds")
}
