use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Duration;

use super::domain::{
    Application, ApplicationRequirement, ApplicationTrack, RequirementCategory, RequirementId,
    RequirementStatus,
};

/// One entry of a checklist template. Requirement deadlines are expressed
/// relative to the application deadline so the same template works for
/// every admission cycle.
#[derive(Debug, Clone)]
pub struct RequirementSeed {
    pub category: RequirementCategory,
    pub title: &'static str,
    pub days_before_deadline: Option<i64>,
}

/// Static checklist keyed by admission track, applied once at application
/// creation. Which requirements a university demands is configuration
/// data; this crate only materializes it.
#[derive(Debug, Clone)]
pub struct ChecklistTemplate {
    pub track: ApplicationTrack,
    pub seeds: Vec<RequirementSeed>,
}

static REQUIREMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_requirement_id() -> RequirementId {
    let id = REQUIREMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequirementId(format!("req-{id:06}"))
}

impl ChecklistTemplate {
    /// The standard checklist for a track: common items plus the
    /// track-specific additions.
    pub fn standard(track: ApplicationTrack) -> Self {
        let mut seeds = vec![
            RequirementSeed {
                category: RequirementCategory::Essay,
                title: "Personal essay",
                days_before_deadline: Some(14),
            },
            RequirementSeed {
                category: RequirementCategory::Transcript,
                title: "Official transcript request",
                days_before_deadline: Some(21),
            },
            RequirementSeed {
                category: RequirementCategory::Recommendation,
                title: "Teacher recommendation letter",
                days_before_deadline: Some(28),
            },
            RequirementSeed {
                category: RequirementCategory::TestScores,
                title: "Standardized test score report",
                days_before_deadline: Some(14),
            },
            RequirementSeed {
                category: RequirementCategory::Financial,
                title: "Application fee or waiver",
                days_before_deadline: None,
            },
        ];

        match track {
            ApplicationTrack::EarlyDecision => seeds.push(RequirementSeed {
                category: RequirementCategory::Other,
                title: "Early decision agreement",
                days_before_deadline: Some(7),
            }),
            ApplicationTrack::EarlyAction | ApplicationTrack::Regular => {}
            ApplicationTrack::Rolling => seeds.push(RequirementSeed {
                category: RequirementCategory::Other,
                title: "Rolling admission interview",
                days_before_deadline: None,
            }),
        }

        Self { track, seeds }
    }

    /// Builds the requirement records for one newly created application,
    /// all starting at `not_started`.
    pub fn materialize(&self, application: &Application) -> Vec<ApplicationRequirement> {
        self.seeds
            .iter()
            .map(|seed| ApplicationRequirement {
                id: next_requirement_id(),
                application_id: application.id.clone(),
                category: seed.category,
                title: seed.title.to_string(),
                status: RequirementStatus::NotStarted,
                deadline: seed
                    .days_before_deadline
                    .map(|days| application.deadline - Duration::days(days)),
                notes: None,
            })
            .collect()
    }
}
