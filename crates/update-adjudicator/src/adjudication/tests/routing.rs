use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::adjudication::domain::{UpdateStatus, UpdateType};
use crate::adjudication::router::submit_handler;
use crate::adjudication::UpdateRequestService;
use crate::config::AdjudicationConfig;

fn json_post(uri: &str, payload: &impl serde::Serialize) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn submit_via(router: &axum::Router, payload: &impl serde::Serialize) -> Value {
    let response = router
        .clone()
        .oneshot(json_post("/api/v1/updates", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json_body(response).await
}

#[tokio::test]
async fn submit_route_returns_created_decision() {
    let router = router_for(build_service());

    let body = submit_via(&router, &relocation_submission()).await;

    assert_eq!(body["status"], json!("auto_approved"));
    assert_eq!(body["risk_score"].as_f64(), Some(0.14));
    assert_eq!(body["is_life_event"], json!(true));
    assert_eq!(body["life_event_type"], json!("relocation"));
    assert!(body["request_id"].as_str().unwrap().starts_with("REQ"));
}

#[tokio::test]
async fn submit_route_rejects_invalid_payloads() {
    let router = router_for(build_service());

    let response = router
        .oneshot(json_post(
            "/api/v1/updates",
            &submission("tattoo_removal", "left arm", true),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("tattoo_removal"));
}

#[tokio::test]
async fn submit_route_returns_not_found_for_unknown_subject() {
    let router = router_for(build_service());
    let mut payload = relocation_submission();
    payload.subject_id.0 = "000000000000".to_string();

    let response = router
        .oneshot(json_post("/api/v1/updates", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_handler_returns_internal_error_when_pool_offline() {
    let service = Arc::new(UpdateRequestService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(MemoryRegistry::with_subject(subject(SUBJECT, Some(16)))),
        Arc::new(OfflinePool),
        Arc::new(MemoryAudit::default()),
        AdjudicationConfig::default(),
    ));

    let response = submit_handler::<MemoryRepository, MemoryRegistry, OfflinePool, MemoryAudit>(
        State(service),
        axum::Json(high_risk_submission()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn update_types_route_lists_catalogue() {
    let router = router_for(build_service());

    let response = router.oneshot(get("/api/v1/updates/types")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let entries = body.as_array().expect("array payload");
    assert_eq!(entries.len(), 8);
    assert_eq!(entries[0]["id"], json!("name_change"));
    assert_eq!(
        entries[1]["required_documents"],
        json!(["Address Proof (Electricity Bill/Rent Agreement)"])
    );
}

#[tokio::test]
async fn status_route_renders_timeline() {
    let router = router_for(build_service());
    let decision = submit_via(&router, &relocation_submission()).await;
    let request_id = decision["request_id"].as_str().unwrap();

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/updates/{request_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], json!("auto_approved"));
    assert_eq!(body["risk_level"], json!("Low"));
    assert_eq!(body["duplicate_confidence"], json!(0.0));
    assert_eq!(body["life_event_confidence"], json!(0.75));
    assert!(body["processed_at"].is_string());
    let steps: Vec<&str> = body["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["step"].as_str().unwrap())
        .collect();
    assert_eq!(
        steps,
        vec!["Submitted", "Duplicate Check", "Risk Assessment", "Completed"]
    );
}

#[tokio::test]
async fn status_route_returns_not_found_for_unknown_request() {
    let router = router_for(build_service());

    let response = router
        .oneshot(get("/api/v1/updates/REQ00000000000000ABCDEF"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subject_updates_route_returns_history_newest_first() {
    let harness = build_service();
    let repository = harness.repository.clone();
    repository.seed(prior("REQ-OLD", UpdateType::AddressChange, "Flat 4, Pune", 10));
    let mut repeat = prior("REQ-NEW", UpdateType::AddressChange, "Flat 4, Pune", 1);
    repeat.status = UpdateStatus::Duplicate;
    repeat.is_duplicate = true;
    repeat.duplicate_confidence = 1.0;
    repeat.processed_at = Some(now() - chrono::Duration::days(1));
    repository.seed(repeat);
    let router = router_for(harness);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/subjects/{SUBJECT}/updates")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let history = body.as_array().expect("array payload");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["request_id"], json!("REQ-NEW"));
    assert_eq!(history[0]["status"], json!("duplicate"));
    assert_eq!(history[0]["duplicate_confidence"], json!(1.0));
    assert!(history[0]["processed_at"].is_string());
    assert_eq!(history[1]["request_id"], json!("REQ-OLD"));
    assert!(history[1].get("processed_at").is_none());

    let limited = router
        .clone()
        .oneshot(get(&format!("/api/v1/subjects/{SUBJECT}/updates?limit=1")))
        .await
        .unwrap();
    let body = read_json_body(limited).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let unknown = router
        .oneshot(get("/api/v1/subjects/000000000000/updates"))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queue_route_honours_limit() {
    let router = router_for(build_service());
    submit_via(&router, &high_risk_submission()).await;
    submit_via(&router, &submission("name_change", "Amit Kumar Patel", true)).await;

    let response = router
        .clone()
        .oneshot(get("/api/v1/officer/queue?limit=1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let queue = body.as_array().expect("array payload");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["update_type"], json!("biometric_update"));
    assert_eq!(queue[0]["risk_level"], json!("High"));
}

#[tokio::test]
async fn decision_route_approves_then_conflicts() {
    let router = router_for(build_service());
    let decision = submit_via(&router, &high_risk_submission()).await;
    let payload = json!({
        "request_id": decision["request_id"],
        "officer_id": decision["assigned_officer"],
        "action": "approve",
    });

    let first = router
        .clone()
        .oneshot(json_post("/api/v1/officer/decisions", &payload))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let body = read_json_body(first).await;
    assert_eq!(body["status"], json!("approved"));

    let second = router
        .oneshot(json_post("/api/v1/officer/decisions", &payload))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn decision_route_returns_not_found_for_unknown_officer() {
    let router = router_for(build_service());
    let decision = submit_via(&router, &high_risk_submission()).await;

    let response = router
        .oneshot(json_post(
            "/api/v1/officer/decisions",
            &json!({
                "request_id": decision["request_id"],
                "officer_id": "OFF404",
                "action": "reject",
                "reason": "illegible scan",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_pending_route_reports_summary() {
    let router = router_for(build_service());

    let response = router
        .oneshot(
            Request::post("/api/v1/officer/assign-pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({ "examined": 0, "assigned": 0, "still_pending": 0 })
    );
}
