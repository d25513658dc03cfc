use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::appointments::AppointmentDesk;
use super::domain::{
    AppointmentId, AppointmentRequest, AppointmentUpdate, CompanyMatchId, ProfileId, UserId,
};
use super::matcher::CompanyMatcher;
use super::AdmissionError;
use crate::workflows::applications::RepositoryError;

/// Header carrying the authenticated user, set by the gateway in front of the service.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AdmissionState {
    pub matcher: Arc<CompanyMatcher>,
    pub appointments: Arc<AppointmentDesk>,
}

pub fn admission_router(state: AdmissionState) -> Router {
    Router::new()
        .route(
            "/api/v1/profiles/:profile_id/matches",
            post(match_profile_handler).get(ranked_matches_handler),
        )
        .route(
            "/api/v1/matches/:match_id/selection",
            post(selection_handler),
        )
        .route("/api/v1/appointments", post(request_appointment_handler))
        .route(
            "/api/v1/appointments/reminders",
            post(reminder_sweep_handler),
        )
        .route(
            "/api/v1/appointments/:appointment_id/status",
            post(appointment_status_handler),
        )
        .route(
            "/api/v1/appointments/:appointment_id/cancel",
            post(cancel_appointment_handler),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MatchRequestBody {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RankedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionBody {
    pub selected: bool,
}

pub(crate) fn status_for(error: &AdmissionError) -> StatusCode {
    match error {
        AdmissionError::ProfileNotFound(_)
        | AdmissionError::CompanyNotFound(_)
        | AdmissionError::MatchNotFound(_)
        | AdmissionError::AppointmentNotFound(_)
        | AdmissionError::NoCompaniesAvailable
        | AdmissionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AdmissionError::Forbidden(_) => StatusCode::FORBIDDEN,
        AdmissionError::IncompleteProfile(_) | AdmissionError::InvalidAppointment(_) => {
            StatusCode::BAD_REQUEST
        }
        AdmissionError::InvalidTransition { .. }
        | AdmissionError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AdmissionError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: AdmissionError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (status_for(&error), Json(payload)).into_response()
}

fn current_user(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({ "error": format!("missing {USER_HEADER} header") });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
}

pub(crate) async fn match_profile_handler(
    State(state): State<AdmissionState>,
    Path(profile_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<MatchRequestBody>>,
) -> Response {
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let refresh = body.map(|Json(body)| body.refresh).unwrap_or(false);

    match state
        .matcher
        .match_profile_with_companies(&ProfileId(profile_id), &user, refresh)
        .await
    {
        Ok(run) => (StatusCode::OK, Json(run)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ranked_matches_handler(
    State(state): State<AdmissionState>,
    Path(profile_id): Path<String>,
    Query(query): Query<RankedQuery>,
    headers: HeaderMap,
) -> Response {
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let limit = query.limit.unwrap_or(20).min(100);

    match state
        .matcher
        .ranked_matches(&ProfileId(profile_id), &user, limit)
    {
        Ok(matches) => (StatusCode::OK, Json(matches)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn selection_handler(
    State(state): State<AdmissionState>,
    Path(match_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SelectionBody>,
) -> Response {
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .matcher
        .toggle_selection(&CompanyMatchId(match_id), &user, body.selected)
    {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn request_appointment_handler(
    State(state): State<AdmissionState>,
    headers: HeaderMap,
    Json(request): Json<AppointmentRequest>,
) -> Response {
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.appointments.request_appointment(&user, request).await {
        Ok(appointment) => (StatusCode::CREATED, Json(appointment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn appointment_status_handler(
    State(state): State<AdmissionState>,
    Path(appointment_id): Path<Uuid>,
    Json(update): Json<AppointmentUpdate>,
) -> Response {
    match state
        .appointments
        .update_status(&AppointmentId(appointment_id), update)
        .await
    {
        Ok(appointment) => (StatusCode::OK, Json(appointment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_appointment_handler(
    State(state): State<AdmissionState>,
    Path(appointment_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .appointments
        .cancel(&AppointmentId(appointment_id), &user)
    {
        Ok(appointment) => (StatusCode::OK, Json(appointment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reminder_sweep_handler(State(state): State<AdmissionState>) -> Response {
    match state.appointments.send_due_reminders(Utc::now()).await {
        Ok(sweep) => (StatusCode::OK, Json(sweep)).into_response(),
        Err(error) => error_response(error),
    }
}
