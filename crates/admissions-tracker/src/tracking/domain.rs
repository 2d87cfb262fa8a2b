use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::urgency::UrgencyTier;

/// Identifier wrapper for an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for the owning student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for a single requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementId(pub String);

/// Identifier wrapper for a status history entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub String);

/// Identifier wrapper for a persisted notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

/// Admission track the application is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationTrack {
    EarlyDecision,
    EarlyAction,
    Regular,
    Rolling,
}

impl ApplicationTrack {
    pub const fn label(self) -> &'static str {
        match self {
            Self::EarlyDecision => "Early Decision",
            Self::EarlyAction => "Early Action",
            Self::Regular => "Regular Decision",
            Self::Rolling => "Rolling Admission",
        }
    }
}

/// Lifecycle stage of an application. The variants form a total order;
/// the engine only ever moves forward along it and `Decided` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    NotStarted,
    InProgress,
    Submitted,
    UnderReview,
    Decided,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::NotStarted,
            Self::InProgress,
            Self::Submitted,
            Self::UnderReview,
            Self::Decided,
        ]
    }

    /// Single allowed forward edge, `None` from the terminal stage.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::InProgress),
            Self::InProgress => Some(Self::Submitted),
            Self::Submitted => Some(Self::UnderReview),
            Self::UnderReview => Some(Self::Decided),
            Self::Decided => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::Decided => "Decided",
        }
    }

    /// Fixed display descriptor per stage. Total over the enumeration.
    pub const fn info(self) -> StatusInfo {
        match self {
            Self::NotStarted => StatusInfo {
                label: "Not Started",
                color: "gray",
                description: "The application has been created but no work has begun.",
            },
            Self::InProgress => StatusInfo {
                label: "In Progress",
                color: "blue",
                description: "Requirements are underway but the application is not submitted.",
            },
            Self::Submitted => StatusInfo {
                label: "Submitted",
                color: "purple",
                description: "The application has been submitted to the university.",
            },
            Self::UnderReview => StatusInfo {
                label: "Under Review",
                color: "amber",
                description: "The university is reviewing the submitted application.",
            },
            Self::Decided => StatusInfo {
                label: "Decided",
                color: "green",
                description: "The university has issued a final decision.",
            },
        }
    }
}

/// Display descriptor for one status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub label: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

/// Final outcome once a decision has been issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Accepted,
    Rejected,
    Waitlisted,
}

/// One student's candidacy at one institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub university: String,
    pub track: ApplicationTrack,
    pub status: ApplicationStatus,
    /// Always concrete; there is no such thing as an application without
    /// a deadline once it exists.
    pub deadline: DateTime<Utc>,
    pub decision: Option<DecisionOutcome>,
    /// Set by the trusted external submission signal. Required before the
    /// engine will auto-advance `in_progress -> submitted`.
    pub submission_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of task gating an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCategory {
    Essay,
    Transcript,
    Recommendation,
    TestScores,
    Financial,
    Other,
}

impl RequirementCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Essay => "Essay",
            Self::Transcript => "Transcript",
            Self::Recommendation => "Recommendation",
            Self::TestScores => "Test Scores",
            Self::Financial => "Financial",
            Self::Other => "Other",
        }
    }
}

/// Completion state of one requirement. Ordered so reversions can be
/// detected and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl RequirementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

/// One discrete task gating an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRequirement {
    pub id: RequirementId,
    pub application_id: ApplicationId,
    pub category: RequirementCategory,
    pub title: String,
    pub status: RequirementStatus,
    /// Independent of the application deadline; not every task has one.
    pub deadline: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Identity recorded on a history entry: the acting student, or the
/// system sentinel for automatic transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Student(StudentId),
    System,
}

/// Immutable audit record of one status change. `from_status` is `None`
/// only for the entry written when the application is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: HistoryId,
    pub application_id: ApplicationId,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub actor: Actor,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// The application or requirement an alert or notification points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    Application(ApplicationId),
    Requirement(RequirementId),
}

/// What a persisted notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DeadlineReminder,
    Overdue,
    Other,
}

/// Persisted, user-facing record that an alert was raised. At most one
/// exists per `(recipient, source, kind, tier)` key; the store enforces
/// that atomically on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: StudentId,
    pub kind: NotificationKind,
    pub source: AlertSource,
    pub tier: UrgencyTier,
    pub title: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
