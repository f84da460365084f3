//! Purchase endpoints: gateway checkout, the "I paid" claim, and the
//! status poll target.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn create_subscription_returns_gateway_id() {
    let state = test_state();
    let response = post_json(
        app(state),
        "/subscriptions/create",
        json!({ "plan_id": "pro_monthly", "email": "asha@x.com" }),
    )
    .await;

    assert_status(&response, StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["subscription_id"], STUB_SUBSCRIPTION_ID);
}

#[tokio::test]
async fn create_subscription_validates_input() {
    let state = test_state();

    let missing_plan = post_json(
        app(state.clone()),
        "/subscriptions/create",
        json!({ "plan_id": " ", "email": "asha@x.com" }),
    )
    .await;
    assert_status(&missing_plan, StatusCode::BAD_REQUEST);

    let bad_email = post_json(
        app(state),
        "/subscriptions/create",
        json!({ "plan_id": "pro_monthly", "email": "nope" }),
    )
    .await;
    assert_status(&bad_email, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_failure_surfaces_as_500() {
    let state = test_state_with_gateway(StubGateway::failing("order limit exceeded"));
    let response = post_json(
        app(state),
        "/subscriptions/create",
        json!({ "plan_id": "pro_monthly", "email": "asha@x.com" }),
    )
    .await;

    assert_status(&response, StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["details"], "order limit exceeded");
}

#[tokio::test]
async fn signal_creates_submitted_order_and_pending_entitlement() {
    let state = test_state();
    create_test_user(&state, "asha@x.com");

    let response = post_json(
        app(state.clone()),
        "/subscriptions/signal",
        json!({ "email": "asha@x.com", "signal_token": "TXN1" }),
    )
    .await;

    assert_status(&response, StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["order"]["status"], "submitted");
    assert_eq!(body["order"]["claimed_signal_token"], "TXN1");

    let status = get(app(state), "/subscriptions/status?email=asha@x.com").await;
    let status = body_json(status).await;
    assert_eq!(status["entitlement"], "pending");
    assert_eq!(status["latest_order"]["status"], "submitted");
    assert!(status.get("invoice_order").is_none());
}

#[tokio::test]
async fn signal_unknown_user_is_404() {
    let state = test_state();
    let response = post_json(
        app(state),
        "/subscriptions/signal",
        json!({ "email": "ghost@x.com", "signal_token": "TXN1" }),
    )
    .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signal_requires_a_token() {
    let state = test_state();
    create_test_user(&state, "asha@x.com");

    let response = post_json(
        app(state),
        "/subscriptions/signal",
        json!({ "email": "asha@x.com", "signal_token": "" }),
    )
    .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_unknown_user_is_404() {
    let state = test_state();
    let response = get(app(state), "/subscriptions/status?email=ghost@x.com").await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_reflects_confirmation_and_invoice() {
    let state = test_state();
    create_test_user(&state, "asha@x.com");
    {
        let mut conn = state.db.get().unwrap();
        submit_claim(&mut conn, "asha@x.com", "TXN1").unwrap().unwrap();
        apply_confirmation(&mut conn, "asha@x.com", ConfirmationSource::Webhook, "pay_1").unwrap();
    }

    let response = get(app(state), "/subscriptions/status?email=asha@x.com").await;
    assert_status(&response, StatusCode::OK);
    let status = body_json(response).await;

    assert_eq!(status["entitlement"], "pro");
    assert_eq!(status["entitlement_source_id"], "pay_1");
    assert_eq!(status["latest_order"]["status"], "approved");
    assert_eq!(status["invoice_order"]["gateway_reference"], "pay_1");
}
