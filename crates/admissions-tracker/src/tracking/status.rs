use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::clock::Clock;

use super::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, HistoryId, StatusHistoryEntry, StudentId,
};
use super::progress;
use super::store::{ApplicationStore, RequirementStore, StoreError};

/// Failure modes of a transition request. Invalid targets and unknown
/// applications are deterministic validation failures; retrying them is
/// pointless.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("invalid transition {} -> {}", from.label(), to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one automatic-transition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoTransitionOutcome {
    pub transitioned: bool,
    pub status: ApplicationStatus,
}

static HISTORY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_history_id() -> HistoryId {
    let id = HISTORY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    HistoryId(format!("hist-{id:06}"))
}

const AUTO_NOTE_STARTED: &str = "auto-advanced: first requirement underway";
const AUTO_NOTE_COMPLETED: &str = "auto-advanced: all requirements completed";

/// Enforces the application lifecycle state machine. Transitions commit
/// through the store's atomic status-update + history-append contract, so
/// either both writes land or neither does.
pub struct StatusTransitionEngine<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> StatusTransitionEngine<S, C>
where
    S: ApplicationStore + RequirementStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Manually requested transition. Only the single forward edge from
    /// the current status is allowed; backward moves and skipping ahead
    /// are rejected with the exact edge named so the caller can
    /// self-correct.
    pub fn request_transition(
        &self,
        id: &ApplicationId,
        actor: StudentId,
        target: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Application, TransitionError> {
        let application = self
            .store
            .application(id)?
            .ok_or(TransitionError::NotFound)?;
        let from = application.status;

        if from.next() != Some(target) {
            return Err(TransitionError::InvalidTransition { from, to: target });
        }

        let entry = StatusHistoryEntry {
            id: next_history_id(),
            application_id: id.clone(),
            from_status: Some(from),
            to_status: target,
            actor: Actor::Student(actor),
            notes,
            recorded_at: self.clock.now(),
        };

        let updated = self.store.apply_transition(id, from, target, entry)?;
        info!(
            application = %id.0,
            from = from.label(),
            to = target.label(),
            "manual status transition"
        );
        Ok(updated)
    }

    /// Evaluates whether requirement progress triggers an automatic
    /// advance. Invoked after every requirement-status write.
    ///
    /// Policy: `not_started -> in_progress` once any requirement is
    /// underway; `in_progress -> submitted` only when every requirement is
    /// completed *and* the external submission confirmation has been
    /// recorded. Stages past `submitted` are never advanced automatically.
    ///
    /// Idempotent: with no intervening requirement change the second call
    /// reports `transitioned: false`, and a concurrent advance that wins
    /// the `apply_transition` race is treated as a no-op rather than an
    /// error.
    pub fn evaluate_auto_transition(
        &self,
        id: &ApplicationId,
    ) -> Result<AutoTransitionOutcome, TransitionError> {
        let application = self
            .store
            .application(id)?
            .ok_or(TransitionError::NotFound)?;
        let requirements = self.store.requirements_for(id)?;
        let progress = progress::summarize(&requirements, self.clock.today());

        let advance = match application.status {
            ApplicationStatus::NotStarted if progress.any_underway() => {
                Some((ApplicationStatus::InProgress, AUTO_NOTE_STARTED))
            }
            ApplicationStatus::InProgress
                if progress.all_completed() && application.submission_confirmed =>
            {
                Some((ApplicationStatus::Submitted, AUTO_NOTE_COMPLETED))
            }
            _ => None,
        };

        let Some((target, note)) = advance else {
            return Ok(AutoTransitionOutcome {
                transitioned: false,
                status: application.status,
            });
        };

        let entry = StatusHistoryEntry {
            id: next_history_id(),
            application_id: id.clone(),
            from_status: Some(application.status),
            to_status: target,
            actor: Actor::System,
            notes: Some(note.to_string()),
            recorded_at: self.clock.now(),
        };

        match self.store.apply_transition(id, application.status, target, entry) {
            Ok(updated) => {
                info!(
                    application = %id.0,
                    to = target.label(),
                    "automatic status transition"
                );
                Ok(AutoTransitionOutcome {
                    transitioned: true,
                    status: updated.status,
                })
            }
            // Lost the race: another writer already advanced the status.
            Err(StoreError::Conflict) => {
                let current = self
                    .store
                    .application(id)?
                    .ok_or(TransitionError::NotFound)?;
                Ok(AutoTransitionOutcome {
                    transitioned: false,
                    status: current.status,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Records the trusted external confirmation that the application was
    /// actually submitted, then re-evaluates the automatic policy. Full
    /// requirement completion alone never advances past `in_progress`
    /// without this signal.
    pub fn confirm_submission(
        &self,
        id: &ApplicationId,
    ) -> Result<AutoTransitionOutcome, TransitionError> {
        self.store.confirm_submission(id, self.clock.now())?;
        self.evaluate_auto_transition(id)
    }
}
