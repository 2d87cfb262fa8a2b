use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::Clock;

use super::alerts::DeadlineAlertAggregator;
use super::domain::{Notification, NotificationId, NotificationKind};
use super::store::{
    ApplicationStore, DedupOutcome, NotificationStore, RequirementStore, StoreError,
};
use super::urgency::{UrgencyTier, ALERT_HORIZON_DAYS};

/// How long notifications are kept before the cleanup task purges them.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub read_retention_days: i64,
    pub unread_retention_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            read_retention_days: 30,
            unread_retention_days: 180,
        }
    }
}

/// Which scheduler task an external trigger selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduledTask {
    DeadlineReminders,
    OverdueDeadlines,
    Cleanup,
    All,
}

/// Per-task counts plus any per-item failures. Partial success is the
/// norm for bulk scheduled work; one student's failure never stops the
/// rest of the sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub created: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Outcome of one task inside a scheduled run. `Failed` is reserved for
/// the store being unreachable at the top of the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed {
        #[serde(flatten)]
        report: TaskReport,
    },
    Failed {
        error: String,
    },
}

/// Aggregate result of one scheduling cycle. Tasks the selector excluded
/// are `None`; included tasks always report, never panic through.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledRunReport {
    pub ran_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_reminders: Option<TaskOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_deadlines: Option<TaskOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<TaskOutcome>,
}

static NOTIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_notification_id() -> NotificationId {
    let id = NOTIFICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    NotificationId(format!("notif-{id:06}"))
}

/// Orchestrator invoked by the external recurring trigger. Each task is
/// independently invocable and safe to re-run: the dedup key enforced by
/// [`NotificationStore::create_if_absent`] turns a repeat sweep into
/// skips, and cleanup is a pure purge.
pub struct NotificationScheduler<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    aggregator: DeadlineAlertAggregator<S, C>,
    retention: RetentionPolicy,
}

impl<S, C> NotificationScheduler<S, C>
where
    S: ApplicationStore + RequirementStore + NotificationStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, retention: RetentionPolicy) -> Self {
        let aggregator = DeadlineAlertAggregator::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            aggregator,
            retention,
        }
    }

    /// Bulk sweep creating `deadline_reminder` notifications for every
    /// warning- or critical-tier alert that is due today or later.
    /// Strictly-past deadlines belong to the overdue task; a "due today"
    /// item is claimed here, not there.
    pub fn process_deadline_reminders(&self) -> Result<TaskReport, StoreError> {
        self.sweep(NotificationKind::DeadlineReminder, |tier, days_until| {
            days_until >= 0 && matches!(tier, UrgencyTier::Warning | UrgencyTier::Critical)
        })
    }

    /// Bulk sweep creating `overdue` notifications for deadlines that are
    /// strictly past. Separated from same-day reminders because "already
    /// missed" warrants different user-facing treatment than "due today".
    pub fn process_overdue_deadlines(&self) -> Result<TaskReport, StoreError> {
        self.sweep(NotificationKind::Overdue, |_, days_until| days_until < 0)
    }

    fn sweep(
        &self,
        kind: NotificationKind,
        wanted: impl Fn(UrgencyTier, i64) -> bool,
    ) -> Result<TaskReport, StoreError> {
        // An unreachable store here fails the whole task; per-student and
        // per-item failures below are collected instead.
        let students = self.store.students_with_open_applications()?;

        let mut report = TaskReport::default();
        for student in students {
            let summary = match self.aggregator.collect(&student, ALERT_HORIZON_DAYS, true) {
                Ok(summary) => summary,
                Err(err) => {
                    warn!(student = %student.0, error = %err, "alert collection failed");
                    report.errors.push(format!("student {}: {err}", student.0));
                    continue;
                }
            };

            for alert in summary.alerts {
                if !wanted(alert.tier, alert.days_until) {
                    continue;
                }
                let notification = Notification {
                    id: next_notification_id(),
                    recipient: student.clone(),
                    kind,
                    source: alert.source,
                    tier: alert.tier,
                    title: alert.title,
                    read: false,
                    created_at: self.clock.now(),
                };
                match self.store.create_if_absent(notification) {
                    Ok(DedupOutcome::Created) => report.created += 1,
                    Ok(DedupOutcome::Skipped) => report.skipped += 1,
                    Err(err) => {
                        report.errors.push(format!("student {}: {err}", student.0));
                    }
                }
            }
        }
        Ok(report)
    }

    /// Deletes read notifications past the read-retention window and
    /// unread ones past the much longer unread window, bounding storage
    /// growth. Depends on neither reminder task.
    pub fn cleanup_notifications(&self) -> Result<TaskReport, StoreError> {
        let now = self.clock.now();
        let mut report = TaskReport::default();
        report.deleted += self
            .store
            .purge_read_before(now - Duration::days(self.retention.read_retention_days))?;
        report.deleted += self
            .store
            .purge_unread_before(now - Duration::days(self.retention.unread_retention_days))?;
        Ok(report)
    }

    /// Runs the selected tasks in sequence, collecting each task's result
    /// independently. A failing task never aborts the others; the caller
    /// gets per-task visibility and decides whether to alert operators.
    pub fn run_scheduled_tasks(&self, task: ScheduledTask) -> ScheduledRunReport {
        let ran_at = self.clock.now();
        let selected =
            |candidate: ScheduledTask| task == ScheduledTask::All || task == candidate;
        let outcome = |result: Result<TaskReport, StoreError>, name: &str| match result {
            Ok(report) => {
                info!(
                    task = name,
                    created = report.created,
                    deleted = report.deleted,
                    skipped = report.skipped,
                    errors = report.errors.len(),
                    "scheduler task completed"
                );
                TaskOutcome::Completed { report }
            }
            Err(err) => {
                warn!(task = name, error = %err, "scheduler task failed");
                TaskOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        ScheduledRunReport {
            ran_at,
            deadline_reminders: selected(ScheduledTask::DeadlineReminders).then(|| {
                outcome(self.process_deadline_reminders(), "deadline_reminders")
            }),
            overdue_deadlines: selected(ScheduledTask::OverdueDeadlines)
                .then(|| outcome(self.process_overdue_deadlines(), "overdue_deadlines")),
            cleanup: selected(ScheduledTask::Cleanup)
                .then(|| outcome(self.cleanup_notifications(), "cleanup")),
        }
    }
}
