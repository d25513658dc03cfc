use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::admission::router::{status_for, USER_HEADER};
use crate::workflows::admission::domain::{AppointmentId, AppointmentStatus, ProfileId};
use crate::workflows::admission::{admission_router, AdmissionError};
use crate::workflows::applications::RepositoryError;

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

#[test]
fn admission_errors_map_to_http_statuses() {
    let cases = [
        (
            AdmissionError::ProfileNotFound(ProfileId("p".to_string())),
            StatusCode::NOT_FOUND,
        ),
        (AdmissionError::NoCompaniesAvailable, StatusCode::NOT_FOUND),
        (AdmissionError::Forbidden(owner()), StatusCode::FORBIDDEN),
        (
            AdmissionError::IncompleteProfile(ProfileId("p".to_string())),
            StatusCode::BAD_REQUEST,
        ),
        (
            AdmissionError::InvalidTransition {
                appointment_id: AppointmentId::new(),
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Cancelled,
            },
            StatusCode::CONFLICT,
        ),
        (
            AdmissionError::Repository(RepositoryError::Unavailable("offline".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(status_for(&error), expected, "{error}");
    }
}

#[tokio::test]
async fn matching_requires_a_user() {
    let harness = harness(CompanyScorer::default());
    let router = admission_router(harness.state());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/profiles/{PROFILE}/matches"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn match_then_rank_over_http() {
    let harness = harness(CompanyScorer::default().with("Payline", 88.0));
    harness
        .companies
        .add(company("c-payline", "Payline", "Fintech"))
        .expect("company added");
    let router = admission_router(harness.state());

    let run = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/profiles/{PROFILE}/matches"))
                .header(USER_HEADER, OWNER)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"refresh":true}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(run.status(), StatusCode::OK);
    assert_eq!(json_body(run).await["matched"], 1);

    let ranked = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/profiles/{PROFILE}/matches?limit=5"))
                .header(USER_HEADER, OWNER)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(ranked.status(), StatusCode::OK);
    let body = json_body(ranked).await;
    assert_eq!(body[0]["company_name"], "Payline");
    assert_eq!(body[0]["strength"], "strong");
}

#[tokio::test]
async fn appointment_lifecycle_over_http() {
    let harness = harness(CompanyScorer::default());
    harness
        .companies
        .add(company("c-payline", "Payline", "Fintech"))
        .expect("company added");
    let router = admission_router(harness.state());

    let payload = json!({
        "profile_id": PROFILE,
        "company_id": "c-payline",
        "date": "2030-06-01",
        "time": "10:15",
    });
    let created = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/appointments")
                .header(USER_HEADER, OWNER)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);
    let appointment = json_body(created).await;
    assert_eq!(appointment["status"], "PENDING");
    let id = appointment["id"].as_str().expect("id").to_string();

    let forbidden = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/appointments/{id}/cancel"))
                .header(USER_HEADER, "mallory")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let confirmed = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/appointments/{id}/status"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"CONFIRMED"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(confirmed.status(), StatusCode::OK);

    let reopened = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/appointments/{id}/status"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"PENDING"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(reopened.status(), StatusCode::CONFLICT);
}
