//! Registration API tests driven through the in-process router.

mod common;

use axum::http::StatusCode;
use common::TestFixture;
use serde_json::json;
use ticketgate_core::testing::FailingOp;

#[tokio::test]
async fn test_health_and_config_are_public() {
    let fixture = TestFixture::new();

    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");

    let config = fixture.get("/api/v1/config").await;
    assert_eq!(config.status, StatusCode::OK);
    assert_eq!(config.body["auth"]["method"], "trusted_header");
    assert_eq!(config.body["cache"]["backend"], "memory");
}

#[tokio::test]
async fn test_user_routes_require_identity() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/registrants").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_registration_flow() {
    let fixture = TestFixture::new();
    let ticket_id = fixture.publish(1, 2, "public").await;

    let token = fixture
        .get_as(10, &format!("/api/v1/registrants/{ticket_id}/generate"))
        .await;
    assert_eq!(token.status, StatusCode::OK);
    assert!(token.body["state"].is_null());

    let first = fixture
        .post_empty_as(10, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["remaining"], 1);
    assert_eq!(first.body["user_id"], 10);

    let duplicate = fixture
        .post_empty_as(10, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["code"], "already_registered");

    let second = fixture
        .post_empty_as(11, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(second.body["remaining"], 0);

    let third = fixture
        .post_empty_as(12, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(third.status, StatusCode::CONFLICT);
    assert_eq!(third.body["code"], "quota_exhausted");

    let mine = fixture.get_as(10, "/api/v1/registrants").await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_private_registration_flow() {
    let fixture = TestFixture::new();
    let ticket_id = fixture.publish(1, 5, "private").await;
    let path = format!("/api/v1/registrants/{ticket_id}");

    let missing_state = fixture.post_empty_as(20, &path).await;
    assert_eq!(missing_state.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_state.body["code"], "state_required");

    let unknown_state = fixture
        .post_empty_as(20, &format!("{path}?state=zzzzzz"))
        .await;
    assert_eq!(unknown_state.status, StatusCode::FORBIDDEN);

    let token = fixture.get_as(20, &format!("{path}/generate")).await;
    assert_eq!(token.status, StatusCode::OK);
    let state = token.body["state"].as_str().unwrap().to_string();
    assert_eq!(state.len(), 6);

    let admitted = fixture
        .post_empty_as(20, &format!("{path}?state={state}"))
        .await;
    assert_eq!(admitted.status, StatusCode::CREATED);
    assert_eq!(admitted.body["remaining"], 4);

    let replayed = fixture
        .post_empty_as(20, &format!("{path}?state={state}"))
        .await;
    assert_eq!(replayed.status, StatusCode::FORBIDDEN);
    assert_eq!(replayed.body["code"], "invalid_state");
}

#[tokio::test]
async fn test_owner_lists_and_verifies_registrants() {
    let fixture = TestFixture::new();
    let ticket_id = fixture.publish(1, 10, "public").await;

    let admitted = fixture
        .post_empty_as(30, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    let registrant_id = admitted.body["registrant_id"].as_str().unwrap().to_string();
    for user in 31..34 {
        fixture
            .post_empty_as(user, &format!("/api/v1/registrants/{ticket_id}"))
            .await;
    }

    let page = fixture
        .get_as(1, &format!("/api/v1/registrants/{ticket_id}?page=1&limit=2"))
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["total"], 4);
    assert_eq!(page.body["total_pages"], 2);
    assert_eq!(page.body["data"].as_array().unwrap().len(), 2);

    // Someone else's ticket looks empty.
    let foreign = fixture
        .get_as(2, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(foreign.body["total"], 0);

    let not_owner = fixture
        .patch_as(
            2,
            &format!("/api/v1/registrants/verify/{registrant_id}/{ticket_id}"),
            None,
        )
        .await;
    assert_eq!(not_owner.status, StatusCode::NOT_FOUND);

    let verified = fixture
        .patch_as(
            1,
            &format!("/api/v1/registrants/verify/{registrant_id}/{ticket_id}"),
            None,
        )
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["is_verified"], true);

    let mine = fixture.get_as(30, "/api/v1/registrants").await;
    assert_eq!(mine.body["data"][0]["is_verified"], true);
}

#[tokio::test]
async fn test_ticket_update_and_withdraw() {
    let fixture = TestFixture::new();
    let ticket_id = fixture.publish(1, 1, "public").await;

    fixture
        .post_empty_as(40, &format!("/api/v1/registrants/{ticket_id}"))
        .await;

    let updated = fixture
        .patch_as(
            1,
            &format!("/api/v1/tickets/{ticket_id}"),
            Some(json!({ "quota": 3, "mode": "public" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["quota"], 3);
    assert_eq!(updated.body["registered_count"], 1);

    let admitted = fixture
        .post_empty_as(41, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(admitted.status, StatusCode::CREATED);
    assert_eq!(admitted.body["remaining"], 1);

    let forbidden = fixture
        .delete_as(2, &format!("/api/v1/tickets/{ticket_id}"))
        .await;
    assert_eq!(forbidden.status, StatusCode::NOT_FOUND);

    let withdrawn = fixture
        .delete_as(1, &format!("/api/v1/tickets/{ticket_id}"))
        .await;
    assert_eq!(withdrawn.status, StatusCode::NO_CONTENT);

    let gone = fixture
        .post_empty_as(42, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_ticket_draft() {
    let fixture = TestFixture::new();

    let response = fixture
        .post_as(1, "/api/v1/tickets", json!({ "title": "x", "quota": 0 }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "invalid_request");
}

#[tokio::test]
async fn test_counter_outage_is_generic_503() {
    let fixture = TestFixture::new();
    let ticket_id = fixture.publish(1, 3, "public").await;
    fixture.counter_store.fail(FailingOp::DecrementIfPositive);

    let response = fixture
        .post_empty_as(50, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "Quota store unavailable");
    assert!(!response.body.to_string().contains("injected"));

    fixture.counter_store.heal();
    let retried = fixture
        .post_empty_as(50, &format!("/api/v1/registrants/{ticket_id}"))
        .await;
    assert_eq!(retried.status, StatusCode::CREATED);
    assert_eq!(retried.body["remaining"], 2);
}

#[tokio::test]
async fn test_metrics_endpoint_reports_admissions() {
    let fixture = TestFixture::new();
    let ticket_id = fixture.publish(1, 3, "public").await;
    fixture
        .post_empty_as(60, &format!("/api/v1/registrants/{ticket_id}"))
        .await;

    let metrics = fixture.get("/api/v1/metrics").await;
    assert_eq!(metrics.status, StatusCode::OK);
    let text = metrics.body.as_str().unwrap();
    assert!(text.contains("ticketgate_admission_attempts_total"));
    assert!(text.contains("ticketgate_http_requests_total"));
}
