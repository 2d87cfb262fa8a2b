//! Core engine for tracking multi-stage university applications.
//!
//! The crate owns the application status state machine, the requirement
//! progress aggregation that can drive it automatically, the deadline
//! urgency classifier, and the notification scheduler that turns computed
//! urgency into once-only persisted notifications. Persistence, identity
//! resolution, and delivery are external collaborators reached through the
//! traits in [`tracking::store`].

pub mod clock;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod tracking;
