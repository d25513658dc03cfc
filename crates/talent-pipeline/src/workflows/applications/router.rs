use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, ApplicationStatus, NewApplication};
use super::engine::{ApplicationTriageEngine, TriageError};
use super::repository::RepositoryError;
use super::transmission::export_csv;

/// Router builder exposing scoring, triage, review and audit endpoints.
pub fn application_router(engine: Arc<ApplicationTriageEngine>) -> Router {
    Router::new()
        .route(
            "/api/v1/applications",
            post(register_handler).get(list_handler),
        )
        .route("/api/v1/applications/:application_id", get(status_handler))
        .route(
            "/api/v1/applications/:application_id/matches",
            get(match_history_handler),
        )
        .route(
            "/api/v1/applications/:application_id/score",
            post(score_handler),
        )
        .route(
            "/api/v1/applications/:application_id/triage",
            post(triage_handler),
        )
        .route(
            "/api/v1/applications/:application_id/review",
            post(review_handler),
        )
        .route(
            "/api/v1/applications/:application_id/contract",
            post(contract_handler),
        )
        .route(
            "/api/v1/applications/:application_id/transmissions",
            get(transmissions_handler),
        )
        .route(
            "/api/v1/applications/:application_id/transmissions.csv",
            get(transmissions_csv_handler),
        )
        .with_state(engine)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoreRequestBody {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequestBody {
    pub approved: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContractRequestBody {
    pub contract_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    pub status: Option<ApplicationStatus>,
    pub limit: Option<usize>,
}

/// HTTP status for each engine failure.
pub(crate) fn status_for(error: &TriageError) -> StatusCode {
    match error {
        TriageError::NotFound(_) => StatusCode::NOT_FOUND,
        TriageError::InvalidTransition { .. } | TriageError::ScoreUnavailable(_) => {
            StatusCode::CONFLICT
        }
        TriageError::RecipientUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TriageError::Document { .. } | TriageError::Scoring { .. } => StatusCode::BAD_GATEWAY,
        TriageError::Repository {
            source: RepositoryError::Conflict,
            ..
        } => StatusCode::CONFLICT,
        TriageError::Repository { .. } | TriageError::TransmissionLog { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(error: TriageError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "application_id": error.application_id(),
        "stage": error.stage(),
    });
    (status_for(&error), Json(payload)).into_response()
}

pub(crate) async fn register_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Json(submission): Json<NewApplication>,
) -> Response {
    match engine.register(submission) {
        Ok(record) => (StatusCode::CREATED, Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let status = query.status.unwrap_or(ApplicationStatus::PendingReview);
    let limit = query.limit.unwrap_or(50).min(500);
    match engine.list_by_status(status, limit) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
) -> Response {
    match engine.get(&ApplicationId(application_id)) {
        Ok(record) => (StatusCode::OK, Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn match_history_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
) -> Response {
    match engine.match_history(&ApplicationId(application_id)) {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
    body: Option<Json<ScoreRequestBody>>,
) -> Response {
    let refresh = body.map(|Json(body)| body.refresh).unwrap_or(false);
    match engine
        .score_application(&ApplicationId(application_id), refresh)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn triage_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
) -> Response {
    match engine.triage(&ApplicationId(application_id)).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
    Json(body): Json<ReviewRequestBody>,
) -> Response {
    match engine
        .validate_pending_application(&ApplicationId(application_id), body.approved, body.note)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn contract_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
    Json(body): Json<ContractRequestBody>,
) -> Response {
    if body.contract_url.trim().is_empty() {
        let payload = json!({ "error": "contract_url must not be empty" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }

    match engine
        .issue_contract(&ApplicationId(application_id), body.contract_url.trim())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transmissions_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
) -> Response {
    match engine.transmissions(&ApplicationId(application_id)) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transmissions_csv_handler(
    State(engine): State<Arc<ApplicationTriageEngine>>,
    Path(application_id): Path<String>,
) -> Response {
    let entries = match engine.transmissions(&ApplicationId(application_id)) {
        Ok(entries) => entries,
        Err(error) => return error_response(error),
    };

    match export_csv(&entries) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
