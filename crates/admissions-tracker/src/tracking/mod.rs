//! Application progress tracking: the status state machine, requirement
//! progress aggregation, deadline urgency classification, and the
//! notification scheduling engine built on top of them.

pub mod alerts;
pub mod domain;
pub mod history;
pub mod memory;
pub mod progress;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod store;
pub mod templates;
pub mod urgency;

#[cfg(test)]
mod tests;

pub use alerts::{AlertSummary, DeadlineAlert, DeadlineAlertAggregator};
pub use domain::{
    Actor, AlertSource, Application, ApplicationId, ApplicationRequirement, ApplicationStatus,
    ApplicationTrack, DecisionOutcome, HistoryId, Notification, NotificationId, NotificationKind,
    RequirementCategory, RequirementId, RequirementStatus, StatusHistoryEntry, StatusInfo,
    StudentId,
};
pub use history::{verify_chain, ChainViolation, StatusHistoryLog};
pub use memory::InMemoryTrackerStore;
pub use progress::{summarize, RequirementProgress};
pub use router::{tracker_router, TrackerState, SCHEDULER_SECRET_HEADER, STUDENT_HEADER};
pub use scheduler::{
    NotificationScheduler, RetentionPolicy, ScheduledRunReport, ScheduledTask, TaskOutcome,
    TaskReport,
};
pub use service::{
    ApplicationDetail, ApplicationSummary, NewApplication, RequirementUpdate,
    RequirementUpdateOutcome, StatusDescriptor, TrackerError, TrackerService,
};
pub use status::{AutoTransitionOutcome, StatusTransitionEngine, TransitionError};
pub use store::{
    ApplicationStore, DedupOutcome, HistoryStore, NotificationQuery, NotificationStore,
    RequirementStore, StoreError, TrackerStore,
};
pub use templates::{ChecklistTemplate, RequirementSeed};
pub use urgency::{classify, days_until, UrgencyTier, ALERT_HORIZON_DAYS, WARNING_HORIZON_DAYS};
