use std::sync::Arc;

use thiserror::Error;

use super::domain::{ApplicationId, StatusHistoryEntry, StudentId};
use super::store::{HistoryStore, StoreError};

/// A break found while replaying a status history chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainViolation {
    #[error("entry {index} does not link to its predecessor")]
    BrokenLink { index: usize },
    #[error("entry {index} regresses in the status order")]
    OrderRegression { index: usize },
    #[error("entry {index} is recorded before its predecessor")]
    TimeRegression { index: usize },
}

/// Replay check over one application's ordered entries: every entry must
/// link to its predecessor, advance strictly in the status order, and be
/// recorded no earlier than the one before it.
pub fn verify_chain(entries: &[StatusHistoryEntry]) -> Result<(), ChainViolation> {
    for (index, pair) in entries.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let index = index + 1;
        if current.from_status != Some(previous.to_status) {
            return Err(ChainViolation::BrokenLink { index });
        }
        if current.to_status <= previous.to_status {
            return Err(ChainViolation::OrderRegression { index });
        }
        if current.recorded_at < previous.recorded_at {
            return Err(ChainViolation::TimeRegression { index });
        }
    }
    Ok(())
}

/// Read-side wrapper over the append-only transition ledger.
pub struct StatusHistoryLog<S> {
    store: Arc<S>,
}

impl<S: HistoryStore> StatusHistoryLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The full chain for one application, ascending by time.
    pub fn for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.store.history_for(application)
    }

    /// Latest changes across a student's applications, newest first.
    pub fn recent_changes(
        &self,
        student: &StudentId,
        limit: usize,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.store.recent_history_for(student, limit)
    }
}
