//! In-memory reference implementation of the store contracts.
//!
//! Used by the API service and by the test suites. A single mutex guards
//! all collections so `apply_transition` can update the application row
//! and append its history entry as one atomic unit.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    AlertSource, Application, ApplicationId, ApplicationRequirement, ApplicationStatus,
    Notification, NotificationId, NotificationKind, RequirementId, StatusHistoryEntry, StudentId,
};
use super::store::{
    ApplicationStore, DedupOutcome, HistoryStore, NotificationQuery, NotificationStore,
    RequirementStore, StoreError,
};
use super::urgency::UrgencyTier;

type DedupKey = (StudentId, AlertSource, NotificationKind, UrgencyTier);

#[derive(Default)]
struct State {
    applications: HashMap<ApplicationId, Application>,
    requirements: HashMap<RequirementId, ApplicationRequirement>,
    history: Vec<StatusHistoryEntry>,
    notifications: Vec<Notification>,
    /// Keys of every notification ever created, kept past deletion so a
    /// recipient who dismisses a reminder is not re-notified for the same
    /// (source, kind, tier) on the next cycle. Cleared per source when the
    /// source itself is resolved.
    notification_keys: HashSet<DedupKey>,
}

/// Shared-state store backed by a single mutex.
#[derive(Default, Clone)]
pub struct InMemoryTrackerStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryTrackerStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }
}

impl ApplicationStore for InMemoryTrackerStore {
    fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        let mut state = self.lock();
        if state.applications.contains_key(&application.id) {
            return Err(StoreError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.lock().applications.get(id).cloned())
    }

    fn delete_application(&self, id: &ApplicationId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state
            .applications
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn confirm_submission(
        &self,
        id: &ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let application = state.applications.get_mut(id).ok_or(StoreError::NotFound)?;
        if !application.submission_confirmed {
            application.submission_confirmed = true;
            application.updated_at = at;
        }
        Ok(())
    }

    fn applications_for(&self, student: &StudentId) -> Result<Vec<Application>, StoreError> {
        let state = self.lock();
        let mut applications: Vec<Application> = state
            .applications
            .values()
            .filter(|application| &application.student_id == student)
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.deadline.cmp(&b.deadline));
        Ok(applications)
    }

    fn students_with_open_applications(&self) -> Result<Vec<StudentId>, StoreError> {
        let state = self.lock();
        let mut students: Vec<StudentId> = state
            .applications
            .values()
            .filter(|application| application.status != ApplicationStatus::Decided)
            .map(|application| application.student_id.clone())
            .collect();
        students.sort();
        students.dedup();
        Ok(students)
    }

    fn apply_transition(
        &self,
        id: &ApplicationId,
        expected_from: ApplicationStatus,
        to: ApplicationStatus,
        entry: StatusHistoryEntry,
    ) -> Result<Application, StoreError> {
        let mut state = self.lock();
        let application = match state.applications.get_mut(id) {
            Some(application) => application,
            None => return Err(StoreError::NotFound),
        };
        if application.status != expected_from {
            return Err(StoreError::Conflict);
        }
        application.status = to;
        application.updated_at = entry.recorded_at;
        let updated = application.clone();
        state.history.push(entry);
        Ok(updated)
    }
}

impl RequirementStore for InMemoryTrackerStore {
    fn insert_requirement(
        &self,
        requirement: ApplicationRequirement,
    ) -> Result<ApplicationRequirement, StoreError> {
        let mut state = self.lock();
        if state.requirements.contains_key(&requirement.id) {
            return Err(StoreError::Conflict);
        }
        state
            .requirements
            .insert(requirement.id.clone(), requirement.clone());
        Ok(requirement)
    }

    fn requirement(
        &self,
        id: &RequirementId,
    ) -> Result<Option<ApplicationRequirement>, StoreError> {
        Ok(self.lock().requirements.get(id).cloned())
    }

    fn update_requirement(&self, requirement: ApplicationRequirement) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.requirements.contains_key(&requirement.id) {
            return Err(StoreError::NotFound);
        }
        state
            .requirements
            .insert(requirement.id.clone(), requirement);
        Ok(())
    }

    fn requirements_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<ApplicationRequirement>, StoreError> {
        let state = self.lock();
        let mut requirements: Vec<ApplicationRequirement> = state
            .requirements
            .values()
            .filter(|requirement| &requirement.application_id == application)
            .cloned()
            .collect();
        requirements.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(requirements)
    }

    fn delete_requirements_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<RequirementId>, StoreError> {
        let mut state = self.lock();
        let ids: Vec<RequirementId> = state
            .requirements
            .values()
            .filter(|requirement| &requirement.application_id == application)
            .map(|requirement| requirement.id.clone())
            .collect();
        for id in &ids {
            state.requirements.remove(id);
        }
        Ok(ids)
    }
}

impl HistoryStore for InMemoryTrackerStore {
    fn append_history(&self, entry: StatusHistoryEntry) -> Result<(), StoreError> {
        self.lock().history.push(entry);
        Ok(())
    }

    fn history_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let state = self.lock();
        let mut entries: Vec<StatusHistoryEntry> = state
            .history
            .iter()
            .filter(|entry| &entry.application_id == application)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(entries)
    }

    fn recent_history_for(
        &self,
        student: &StudentId,
        limit: usize,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let state = self.lock();
        let owned: Vec<ApplicationId> = state
            .applications
            .values()
            .filter(|application| &application.student_id == student)
            .map(|application| application.id.clone())
            .collect();
        let mut entries: Vec<StatusHistoryEntry> = state
            .history
            .iter()
            .filter(|entry| owned.contains(&entry.application_id))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries.truncate(limit);
        Ok(entries)
    }

    fn delete_history_for(&self, application: &ApplicationId) -> Result<(), StoreError> {
        self.lock()
            .history
            .retain(|entry| &entry.application_id != application);
        Ok(())
    }
}

impl NotificationStore for InMemoryTrackerStore {
    fn create_if_absent(&self, notification: Notification) -> Result<DedupOutcome, StoreError> {
        let mut state = self.lock();
        let key = (
            notification.recipient.clone(),
            notification.source.clone(),
            notification.kind,
            notification.tier,
        );
        if !state.notification_keys.insert(key) {
            return Ok(DedupOutcome::Skipped);
        }
        state.notifications.push(notification);
        Ok(DedupOutcome::Created)
    }

    fn notification(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError> {
        Ok(self
            .lock()
            .notifications
            .iter()
            .find(|notification| &notification.id == id)
            .cloned())
    }

    fn notifications_for(
        &self,
        recipient: &StudentId,
        query: NotificationQuery,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock();
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|notification| &notification.recipient == recipient)
            .filter(|notification| !query.unread_only || !notification.read)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let notifications: Vec<Notification> = notifications
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(notifications)
    }

    fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification, StoreError> {
        let mut state = self.lock();
        let notification = state
            .notifications
            .iter_mut()
            .find(|notification| &notification.id == id)
            .ok_or(StoreError::NotFound)?;
        notification.read = true;
        Ok(notification.clone())
    }

    fn delete_notification(&self, id: &NotificationId) -> Result<(), StoreError> {
        let mut state = self.lock();
        let before = state.notifications.len();
        state.notifications.retain(|notification| &notification.id != id);
        if state.notifications.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn purge_read_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|notification| !notification.read || notification.created_at >= cutoff);
        Ok(before - state.notifications.len())
    }

    fn purge_unread_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|notification| notification.read || notification.created_at >= cutoff);
        Ok(before - state.notifications.len())
    }

    fn delete_notifications_for_sources(
        &self,
        sources: &[AlertSource],
    ) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|notification| !sources.contains(&notification.source));
        // A resolved source may become relevant again later (a reopened
        // requirement), so its dedup keys are released with it.
        state
            .notification_keys
            .retain(|(_, source, _, _)| !sources.contains(source));
        Ok(before - state.notifications.len())
    }
}
