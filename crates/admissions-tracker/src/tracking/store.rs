use chrono::{DateTime, Utc};
use thiserror::Error;

use super::domain::{
    AlertSource, Application, ApplicationId, ApplicationRequirement, ApplicationStatus,
    Notification, NotificationId, RequirementId, StatusHistoryEntry, StudentId,
};

/// Error enumeration for store failures. `Unavailable` is the only kind
/// that aborts a whole scheduler task; everything else is a deterministic
/// per-record outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflicting write")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of an atomic check-and-insert against the notification dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    Created,
    Skipped,
}

/// Paging and filtering for a recipient's notification listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Storage contract for applications. There is no whole-record update:
/// after insertion every mutation is a targeted write (`apply_transition`
/// for status, `confirm_submission` for the submission flag), so stale
/// read-modify-write cycles cannot clobber concurrent edits.
pub trait ApplicationStore: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, StoreError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn delete_application(&self, id: &ApplicationId) -> Result<(), StoreError>;
    fn applications_for(&self, student: &StudentId) -> Result<Vec<Application>, StoreError>;
    /// Flips the submission-confirmed flag in place, a targeted write so
    /// a concurrent edit to the rest of the record cannot be lost to a
    /// stale read-modify-write. No-op when the flag is already set.
    fn confirm_submission(&self, id: &ApplicationId, at: DateTime<Utc>)
        -> Result<(), StoreError>;
    /// Students with at least one non-decided application, for scheduler fan-out.
    fn students_with_open_applications(&self) -> Result<Vec<StudentId>, StoreError>;
    /// Atomic unit of a status transition: set `status = to` iff the
    /// persisted status still equals `expected_from`, and append the
    /// history entry in the same transaction. Fails with
    /// [`StoreError::Conflict`] when the status moved underneath the
    /// caller, which is what makes concurrent auto-transition checks
    /// idempotent.
    fn apply_transition(
        &self,
        id: &ApplicationId,
        expected_from: ApplicationStatus,
        to: ApplicationStatus,
        entry: StatusHistoryEntry,
    ) -> Result<Application, StoreError>;
}

/// Storage contract for requirements.
pub trait RequirementStore: Send + Sync {
    fn insert_requirement(
        &self,
        requirement: ApplicationRequirement,
    ) -> Result<ApplicationRequirement, StoreError>;
    fn requirement(&self, id: &RequirementId)
        -> Result<Option<ApplicationRequirement>, StoreError>;
    fn update_requirement(&self, requirement: ApplicationRequirement) -> Result<(), StoreError>;
    fn requirements_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<ApplicationRequirement>, StoreError>;
    /// Cascade helper; returns the deleted ids so notification references
    /// can be cleaned up too.
    fn delete_requirements_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<RequirementId>, StoreError>;
}

/// Storage contract for the append-only status history ledger.
pub trait HistoryStore: Send + Sync {
    /// Direct append, used only for the seed entry written at application
    /// creation; transitions append through `apply_transition`.
    fn append_history(&self, entry: StatusHistoryEntry) -> Result<(), StoreError>;
    /// The full chain for one application, ascending by time.
    fn history_for(&self, application: &ApplicationId)
        -> Result<Vec<StatusHistoryEntry>, StoreError>;
    /// Latest entries across all of a student's applications, newest first.
    fn recent_history_for(
        &self,
        student: &StudentId,
        limit: usize,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError>;
    fn delete_history_for(&self, application: &ApplicationId) -> Result<(), StoreError>;
}

/// Storage contract for persisted notifications. Uniqueness on
/// `(recipient, source, kind, tier)` is the store's responsibility, not an
/// application-level pre-check, so it holds under concurrent writers.
pub trait NotificationStore: Send + Sync {
    /// Atomic check-and-insert on the dedup key. The check runs against
    /// every notification ever created for the key, not just the ones
    /// currently present, so a recipient deleting a reminder does not get
    /// the same one recreated on the next sweep. Resolving the source via
    /// [`NotificationStore::delete_notifications_for_sources`] releases
    /// its keys.
    fn create_if_absent(&self, notification: Notification) -> Result<DedupOutcome, StoreError>;
    fn notification(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError>;
    fn notifications_for(
        &self,
        recipient: &StudentId,
        query: NotificationQuery,
    ) -> Result<Vec<Notification>, StoreError>;
    fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification, StoreError>;
    fn delete_notification(&self, id: &NotificationId) -> Result<(), StoreError>;
    fn purge_read_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
    fn purge_unread_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
    fn delete_notifications_for_sources(&self, sources: &[AlertSource])
        -> Result<usize, StoreError>;
}

/// Everything the tracker needs from the transactional store collaborator.
pub trait TrackerStore:
    ApplicationStore + RequirementStore + HistoryStore + NotificationStore
{
}

impl<S> TrackerStore for S where
    S: ApplicationStore + RequirementStore + HistoryStore + NotificationStore
{
}
