use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::clock::Clock;

use super::domain::{ApplicationId, ApplicationStatus, NotificationId, RequirementId, StudentId};
use super::scheduler::ScheduledTask;
use super::service::{NewApplication, RequirementUpdate, TrackerError, TrackerService};
use super::store::{NotificationQuery, StoreError, TrackerStore};

/// Header carrying the acting student identity. Stands in for the
/// external identity/session resolver this core treats as a collaborator.
pub const STUDENT_HEADER: &str = "x-student-id";
/// Header carrying the shared secret of the external recurring trigger.
pub const SCHEDULER_SECRET_HEADER: &str = "x-scheduler-secret";

const DEFAULT_ALERT_WINDOW_DAYS: i64 = 7;
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Shared router state: the service facade plus the trigger secret.
pub struct TrackerState<S, C> {
    pub service: Arc<TrackerService<S, C>>,
    pub trigger_secret: Arc<str>,
}

impl<S, C> Clone for TrackerState<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            trigger_secret: self.trigger_secret.clone(),
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::InvalidTransition { .. } => StatusCode::CONFLICT,
            TrackerError::NotFound => StatusCode::NOT_FOUND,
            TrackerError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TrackerError::Unauthorized => StatusCode::UNAUTHORIZED,
            TrackerError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Router builder exposing the tracking, alerting, and scheduler surfaces.
pub fn tracker_router<S, C>(
    service: Arc<TrackerService<S, C>>,
    trigger_secret: impl Into<Arc<str>>,
) -> Router
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let state = TrackerState {
        service,
        trigger_secret: trigger_secret.into(),
    };

    Router::new()
        .route("/api/v1/applications", post(create_application::<S, C>))
        .route(
            "/api/v1/applications/:application_id",
            get(get_application::<S, C>).delete(delete_application::<S, C>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(request_transition::<S, C>),
        )
        .route(
            "/api/v1/applications/:application_id/status/evaluate",
            post(evaluate_auto_transition::<S, C>),
        )
        .route(
            "/api/v1/applications/:application_id/submission-confirmed",
            post(confirm_submission::<S, C>),
        )
        .route(
            "/api/v1/applications/:application_id/history",
            get(application_history::<S, C>),
        )
        .route(
            "/api/v1/requirements/:requirement_id",
            patch(update_requirement::<S, C>),
        )
        .route(
            "/api/v1/students/:student_id/applications",
            get(student_applications::<S, C>),
        )
        .route(
            "/api/v1/students/:student_id/alerts",
            get(student_alerts::<S, C>),
        )
        .route(
            "/api/v1/students/:student_id/history",
            get(student_history::<S, C>),
        )
        .route(
            "/api/v1/students/:student_id/notifications",
            get(student_notifications::<S, C>),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_notification_read::<S, C>),
        )
        .route(
            "/api/v1/notifications/:notification_id",
            delete(delete_notification::<S, C>),
        )
        .route("/api/v1/statuses", get(status_catalog::<S, C>))
        .route("/api/v1/scheduler/run", post(run_scheduler::<S, C>))
        .with_state(state)
}

fn actor_from(headers: &HeaderMap) -> Result<StudentId, TrackerError> {
    headers
        .get(STUDENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| StudentId(value.to_string()))
        .ok_or_else(|| {
            TrackerError::ValidationFailed(format!("missing {STUDENT_HEADER} header"))
        })
}

async fn create_application<S, C>(
    State(state): State<TrackerState<S, C>>,
    Json(payload): Json<NewApplication>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let detail = state.service.create_application(payload)?;
    Ok((StatusCode::CREATED, Json(detail)).into_response())
}

async fn get_application<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let detail = state
        .service
        .application(&ApplicationId(application_id), &actor)?;
    Ok(Json(detail).into_response())
}

async fn delete_application<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    state
        .service
        .delete_application(&ApplicationId(application_id), &actor)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    target: ApplicationStatus,
    #[serde(default)]
    notes: Option<String>,
}

async fn request_transition<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<TransitionRequest>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let updated = state.service.request_transition(
        &ApplicationId(application_id),
        &actor,
        payload.target,
        payload.notes,
    )?;
    Ok(Json(updated).into_response())
}

async fn evaluate_auto_transition<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let outcome = state
        .service
        .evaluate_auto_transition(&ApplicationId(application_id), &actor)?;
    Ok(Json(outcome).into_response())
}

async fn confirm_submission<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let outcome = state
        .service
        .confirm_submission(&ApplicationId(application_id), &actor)?;
    Ok(Json(outcome).into_response())
}

async fn application_history<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let entries = state
        .service
        .history_for_application(&ApplicationId(application_id), &actor)?;
    Ok(Json(entries).into_response())
}

async fn update_requirement<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(requirement_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RequirementUpdate>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let outcome = state
        .service
        .update_requirement(&RequirementId(requirement_id), &actor, payload)?;
    Ok(Json(outcome).into_response())
}

async fn student_applications<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(student_id): Path<String>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let summaries = state.service.applications_for(&StudentId(student_id))?;
    Ok(Json(summaries).into_response())
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    window_days: Option<i64>,
    include_requirements: Option<bool>,
}

async fn student_alerts<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(student_id): Path<String>,
    Query(query): Query<AlertsQuery>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let summary = state.service.alerts(
        &StudentId(student_id),
        query.window_days.unwrap_or(DEFAULT_ALERT_WINDOW_DAYS),
        query.include_requirements.unwrap_or(true),
    )?;
    Ok(Json(summary).into_response())
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn student_history<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(student_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let entries = state.service.recent_history(
        &StudentId(student_id),
        query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
    )?;
    Ok(Json(entries).into_response())
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    unread_only: Option<bool>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn student_notifications<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(student_id): Path<String>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let notifications = state.service.notifications(
        &StudentId(student_id),
        NotificationQuery {
            unread_only: query.unread_only.unwrap_or(false),
            limit: query.limit,
            offset: query.offset.unwrap_or(0),
        },
    )?;
    Ok(Json(notifications).into_response())
}

async fn mark_notification_read<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(notification_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    let notification = state
        .service
        .mark_notification_read(&NotificationId(notification_id), &actor)?;
    Ok(Json(notification).into_response())
}

async fn delete_notification<S, C>(
    State(state): State<TrackerState<S, C>>,
    Path(notification_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let actor = actor_from(&headers)?;
    state
        .service
        .delete_notification(&NotificationId(notification_id), &actor)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn status_catalog<S, C>(
    State(state): State<TrackerState<S, C>>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(state.service.status_catalog()).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct TriggerRequest {
    task: Option<ScheduledTask>,
}

async fn run_scheduler<S, C>(
    State(state): State<TrackerState<S, C>>,
    headers: HeaderMap,
    payload: Option<Json<TriggerRequest>>,
) -> Result<Response, TrackerError>
where
    S: TrackerStore + 'static,
    C: Clock + 'static,
{
    let presented = headers
        .get(SCHEDULER_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    // Rejected callers get no side effects: the check runs before any task.
    if presented != Some(state.trigger_secret.as_ref()) {
        return Err(TrackerError::Unauthorized);
    }

    let task = payload
        .and_then(|Json(request)| request.task)
        .unwrap_or(ScheduledTask::All);
    let report = state.service.run_scheduled_tasks(task);
    Ok(Json(report).into_response())
}
