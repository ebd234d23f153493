use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::assignment::AssignmentPool;
use super::domain::{RequestId, SubjectId, UpdateSubmission, UpdateType};
use super::repository::{
    AuditSink, RepositoryError, SubjectRegistry, UpdateRepository, UpdateStatusView,
};
use super::service::{OfficerDecision, ReviewError, UpdateRequestService, UpdateServiceError};

const DEFAULT_QUEUE_LIMIT: usize = 20;
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Router builder exposing submission, status and officer endpoints.
pub fn update_router<R, S, P, A>(service: Arc<UpdateRequestService<R, S, P, A>>) -> Router
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/updates", post(submit_handler::<R, S, P, A>))
        .route("/api/v1/updates/types", get(update_types_handler))
        .route(
            "/api/v1/updates/:request_id",
            get(status_handler::<R, S, P, A>),
        )
        .route(
            "/api/v1/subjects/:subject_id/updates",
            get(subject_requests_handler::<R, S, P, A>),
        )
        .route("/api/v1/officer/queue", get(queue_handler::<R, S, P, A>))
        .route(
            "/api/v1/officer/decisions",
            post(review_handler::<R, S, P, A>),
        )
        .route(
            "/api/v1/officer/assign-pending",
            post(assign_pending_handler::<R, S, P, A>),
        )
        .with_state(service)
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateTypeEntry {
    pub(crate) id: &'static str,
    pub(crate) name: &'static str,
    pub(crate) required_documents: &'static [&'static str],
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitParams {
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn submit_handler<R, S, P, A>(
    State(service): State<Arc<UpdateRequestService<R, S, P, A>>>,
    axum::Json(submission): axum::Json<UpdateSubmission>,
) -> Response
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    match service.submit(submission, Utc::now()) {
        Ok(decision) => (StatusCode::CREATED, axum::Json(decision)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_types_handler() -> Response {
    let types: Vec<UpdateTypeEntry> = UpdateType::ALL
        .into_iter()
        .map(|update_type| UpdateTypeEntry {
            id: update_type.label(),
            name: update_type.display_name(),
            required_documents: update_type.required_documents(),
        })
        .collect();
    (StatusCode::OK, axum::Json(types)).into_response()
}

pub(crate) async fn status_handler<R, S, P, A>(
    State(service): State<Arc<UpdateRequestService<R, S, P, A>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    match service.get(&RequestId(request_id)) {
        Ok(request) => (
            StatusCode::OK,
            axum::Json(UpdateStatusView::from_request(&request)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn subject_requests_handler<R, S, P, A>(
    State(service): State<Arc<UpdateRequestService<R, S, P, A>>>,
    Path(subject_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Response
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match service.requests_for_subject(&SubjectId(subject_id), limit) {
        Ok(requests) => {
            let views: Vec<UpdateStatusView> =
                requests.iter().map(UpdateStatusView::from_request).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn queue_handler<R, S, P, A>(
    State(service): State<Arc<UpdateRequestService<R, S, P, A>>>,
    Query(params): Query<LimitParams>,
) -> Response
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    match service.review_queue(limit) {
        Ok(queue) => {
            let views: Vec<UpdateStatusView> =
                queue.iter().map(UpdateStatusView::from_request).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_handler<R, S, P, A>(
    State(service): State<Arc<UpdateRequestService<R, S, P, A>>>,
    axum::Json(decision): axum::Json<OfficerDecision>,
) -> Response
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    match service.review(decision, Utc::now()) {
        Ok(request) => (
            StatusCode::OK,
            axum::Json(UpdateStatusView::from_request(&request)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_pending_handler<R, S, P, A>(
    State(service): State<Arc<UpdateRequestService<R, S, P, A>>>,
) -> Response
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    match service.assign_pending(Utc::now()) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn status_for(err: &UpdateServiceError) -> StatusCode {
    match err {
        UpdateServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        UpdateServiceError::SubjectNotFound(_)
        | UpdateServiceError::Repository(RepositoryError::NotFound)
        | UpdateServiceError::Review(ReviewError::UnknownOfficer(_)) => StatusCode::NOT_FOUND,
        UpdateServiceError::Repository(RepositoryError::Conflict)
        | UpdateServiceError::Review(_)
        | UpdateServiceError::Transition(_) => StatusCode::CONFLICT,
        UpdateServiceError::Repository(RepositoryError::Unavailable(_))
        | UpdateServiceError::Pipeline(_)
        | UpdateServiceError::Assignment(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: UpdateServiceError) -> Response {
    let status = status_for(&err);
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
