use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::clock::Clock;

use super::alerts::{AlertSummary, DeadlineAlertAggregator};
use super::domain::{
    Actor, AlertSource, Application, ApplicationId, ApplicationRequirement, ApplicationStatus,
    ApplicationTrack, Notification, NotificationId, RequirementId, RequirementStatus,
    StatusHistoryEntry, StatusInfo, StudentId,
};
use super::history::StatusHistoryLog;
use super::progress::{self, RequirementProgress};
use super::scheduler::{NotificationScheduler, RetentionPolicy, ScheduledRunReport, ScheduledTask};
use super::status::{next_history_id, AutoTransitionOutcome, StatusTransitionEngine, TransitionError};
use super::store::{NotificationQuery, StoreError, TrackerStore};
use super::templates::ChecklistTemplate;

/// Error surface of the tracker service, mapped onto HTTP codes by the
/// router. Deterministic validation failures are never retried.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid transition {} -> {}", from.label(), to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("record not found")]
    NotFound,
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

impl From<TransitionError> for TrackerError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            TransitionError::NotFound => Self::NotFound,
            TransitionError::Store(err) => err.into(),
        }
    }
}

/// Input for creating an application.
#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
    pub student_id: StudentId,
    pub university: String,
    pub track: ApplicationTrack,
    pub deadline: DateTime<Utc>,
}

/// Patch applied to one requirement by its owning student.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequirementUpdate {
    pub status: Option<RequirementStatus>,
    pub notes: Option<String>,
}

/// An application together with its computed progress figures.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    #[serde(flatten)]
    pub application: Application,
    pub progress: RequirementProgress,
}

/// Full read view of one application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub progress: RequirementProgress,
    pub requirements: Vec<ApplicationRequirement>,
}

/// Result of a requirement write: the stored record plus whatever the
/// auto-transition evaluation decided.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementUpdateOutcome {
    pub requirement: ApplicationRequirement,
    pub auto_transition: AutoTransitionOutcome,
}

/// One status enumeration value with its display descriptor.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusDescriptor {
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub info: StatusInfo,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Facade composing the transition engine, alert aggregator, history log,
/// and scheduler over one transactional store and one clock. Holds no
/// state of its own beyond those collaborators; every read recomputes
/// from current store data.
pub struct TrackerService<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    engine: StatusTransitionEngine<S, C>,
    aggregator: DeadlineAlertAggregator<S, C>,
    history: StatusHistoryLog<S>,
    scheduler: NotificationScheduler<S, C>,
}

impl<S, C> TrackerService<S, C>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, retention: RetentionPolicy) -> Self {
        Self {
            engine: StatusTransitionEngine::new(store.clone(), clock.clone()),
            aggregator: DeadlineAlertAggregator::new(store.clone(), clock.clone()),
            history: StatusHistoryLog::new(store.clone()),
            scheduler: NotificationScheduler::new(store.clone(), clock.clone(), retention),
            store,
            clock,
        }
    }

    /// Creates the application at `not_started`, seeds its requirement
    /// checklist from the track's template, and writes the initial
    /// history entry (the only one with a null prior status).
    pub fn create_application(
        &self,
        new: NewApplication,
    ) -> Result<ApplicationDetail, TrackerError> {
        if new.university.trim().is_empty() {
            return Err(TrackerError::ValidationFailed(
                "university must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let application = Application {
            id: next_application_id(),
            student_id: new.student_id.clone(),
            university: new.university,
            track: new.track,
            status: ApplicationStatus::NotStarted,
            deadline: new.deadline,
            decision: None,
            submission_confirmed: false,
            created_at: now,
            updated_at: now,
        };
        let application = self.store.insert_application(application)?;

        let template = ChecklistTemplate::standard(application.track);
        let mut requirements = Vec::new();
        for requirement in template.materialize(&application) {
            requirements.push(self.store.insert_requirement(requirement)?);
        }

        self.store.append_history(StatusHistoryEntry {
            id: next_history_id(),
            application_id: application.id.clone(),
            from_status: None,
            to_status: ApplicationStatus::NotStarted,
            actor: Actor::Student(new.student_id),
            notes: None,
            recorded_at: now,
        })?;

        info!(application = %application.id.0, university = %application.university, "application created");
        let progress = progress::summarize(&requirements, self.clock.today());
        Ok(ApplicationDetail {
            application,
            progress,
            requirements,
        })
    }

    /// Reads one application scoped to its owner; an application owned by
    /// someone else is indistinguishable from a missing one.
    pub fn application(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
    ) -> Result<ApplicationDetail, TrackerError> {
        let application = self.owned_application(id, actor)?;
        let requirements = self.store.requirements_for(id)?;
        let progress = progress::summarize(&requirements, self.clock.today());
        Ok(ApplicationDetail {
            application,
            progress,
            requirements,
        })
    }

    pub fn applications_for(
        &self,
        student: &StudentId,
    ) -> Result<Vec<ApplicationSummary>, TrackerError> {
        let today = self.clock.today();
        let mut summaries = Vec::new();
        for application in self.store.applications_for(student)? {
            let requirements = self.store.requirements_for(&application.id)?;
            summaries.push(ApplicationSummary {
                progress: progress::summarize(&requirements, today),
                application,
            });
        }
        Ok(summaries)
    }

    /// Deletes an application and cascades to its requirements, history,
    /// and any notifications referencing either.
    pub fn delete_application(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
    ) -> Result<(), TrackerError> {
        self.owned_application(id, actor)?;
        let requirement_ids = self.store.delete_requirements_for(id)?;
        let mut sources: Vec<AlertSource> = requirement_ids
            .into_iter()
            .map(AlertSource::Requirement)
            .collect();
        sources.push(AlertSource::Application(id.clone()));
        self.store.delete_notifications_for_sources(&sources)?;
        self.store.delete_history_for(id)?;
        self.store.delete_application(id)?;
        info!(application = %id.0, "application deleted");
        Ok(())
    }

    pub fn request_transition(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
        target: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Application, TrackerError> {
        self.owned_application(id, actor)?;
        let updated = self
            .engine
            .request_transition(id, actor.clone(), target, notes)?;
        Ok(updated)
    }

    pub fn evaluate_auto_transition(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
    ) -> Result<AutoTransitionOutcome, TrackerError> {
        self.owned_application(id, actor)?;
        Ok(self.engine.evaluate_auto_transition(id)?)
    }

    pub fn confirm_submission(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
    ) -> Result<AutoTransitionOutcome, TrackerError> {
        self.owned_application(id, actor)?;
        Ok(self.engine.confirm_submission(id)?)
    }

    /// Applies a student's edit to one requirement. Reversions are
    /// permitted but logged; a change in status (and only a change)
    /// triggers the auto-transition evaluation.
    pub fn update_requirement(
        &self,
        id: &RequirementId,
        actor: &StudentId,
        update: RequirementUpdate,
    ) -> Result<RequirementUpdateOutcome, TrackerError> {
        let mut requirement = self.store.requirement(id)?.ok_or(TrackerError::NotFound)?;
        let application = self.owned_application(&requirement.application_id, actor)?;

        let mut status_changed = false;
        if let Some(status) = update.status {
            if status < requirement.status {
                info!(
                    requirement = %requirement.id.0,
                    from = requirement.status.label(),
                    to = status.label(),
                    "requirement status reverted"
                );
            }
            status_changed = status != requirement.status;
            requirement.status = status;
        }
        if let Some(notes) = update.notes {
            requirement.notes = Some(notes);
        }
        self.store.update_requirement(requirement.clone())?;

        let auto_transition = if status_changed {
            self.engine
                .evaluate_auto_transition(&requirement.application_id)?
        } else {
            AutoTransitionOutcome {
                transitioned: false,
                status: application.status,
            }
        };

        Ok(RequirementUpdateOutcome {
            requirement,
            auto_transition,
        })
    }

    /// Merged deadline alerts for one student. The lookahead window is
    /// bounded to a sane range; the classifier further drops anything
    /// past its own horizon.
    pub fn alerts(
        &self,
        student: &StudentId,
        window_days: i64,
        include_requirements: bool,
    ) -> Result<AlertSummary, TrackerError> {
        if !(1..=365).contains(&window_days) {
            return Err(TrackerError::ValidationFailed(
                "window_days must be between 1 and 365".to_string(),
            ));
        }
        Ok(self
            .aggregator
            .collect(student, window_days, include_requirements)?)
    }

    pub fn history_for_application(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
    ) -> Result<Vec<StatusHistoryEntry>, TrackerError> {
        self.owned_application(id, actor)?;
        Ok(self.history.for_application(id)?)
    }

    pub fn recent_history(
        &self,
        student: &StudentId,
        limit: usize,
    ) -> Result<Vec<StatusHistoryEntry>, TrackerError> {
        Ok(self.history.recent_changes(student, limit)?)
    }

    pub fn notifications(
        &self,
        recipient: &StudentId,
        query: NotificationQuery,
    ) -> Result<Vec<Notification>, TrackerError> {
        Ok(self.store.notifications_for(recipient, query)?)
    }

    pub fn mark_notification_read(
        &self,
        id: &NotificationId,
        recipient: &StudentId,
    ) -> Result<Notification, TrackerError> {
        self.owned_notification(id, recipient)?;
        Ok(self.store.mark_notification_read(id)?)
    }

    pub fn delete_notification(
        &self,
        id: &NotificationId,
        recipient: &StudentId,
    ) -> Result<(), TrackerError> {
        self.owned_notification(id, recipient)?;
        Ok(self.store.delete_notification(id)?)
    }

    /// Entry point for the external recurring trigger, after the caller
    /// has been authenticated at the HTTP boundary.
    pub fn run_scheduled_tasks(&self, task: ScheduledTask) -> ScheduledRunReport {
        self.scheduler.run_scheduled_tasks(task)
    }

    /// Display descriptors for the full status enumeration.
    pub fn status_catalog(&self) -> Vec<StatusDescriptor> {
        ApplicationStatus::ordered()
            .into_iter()
            .map(|status| StatusDescriptor {
                status,
                info: status.info(),
            })
            .collect()
    }

    fn owned_application(
        &self,
        id: &ApplicationId,
        actor: &StudentId,
    ) -> Result<Application, TrackerError> {
        let application = self.store.application(id)?.ok_or(TrackerError::NotFound)?;
        if &application.student_id != actor {
            return Err(TrackerError::NotFound);
        }
        Ok(application)
    }

    fn owned_notification(
        &self,
        id: &NotificationId,
        recipient: &StudentId,
    ) -> Result<Notification, TrackerError> {
        let notification = self.store.notification(id)?.ok_or(TrackerError::NotFound)?;
        if &notification.recipient != recipient {
            return Err(TrackerError::NotFound);
        }
        Ok(notification)
    }
}
