//! Purchase endpoints.
//!
//! `/subscriptions/create` is the card/autopay path through the gateway API
//! (that path later confirms itself via webhook). `/subscriptions/signal` is
//! the UPI path's "I paid" claim, and `/subscriptions/status` is the target
//! the client polls while waiting for a confirmation to land.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, Query};
use crate::models::{validate_email_format, Entitlement, Order, OrderStatus, SignalPaidRequest};
use crate::reconcile::submit_claim;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/create", post(create_subscription))
        .route("/subscriptions/signal", post(signal_paid))
        .route("/subscriptions/status", get(subscription_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    pub success: bool,
    pub subscription_id: String,
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<Json<CreateSubscriptionResponse>> {
    if request.plan_id.trim().is_empty() {
        return Err(AppError::BadRequest(msg::PLAN_ID_EMPTY.into()));
    }
    validate_email_format(&request.email)?;

    // Gateway failure surfaces as a 500 with the gateway's message passed
    // through; nothing was committed locally, so the whole call is
    // retry-safe for the client.
    let subscription_id = state
        .gateway
        .create_subscription(request.plan_id.trim(), request.email.trim())
        .await?;

    tracing::info!(
        "gateway subscription created: plan={}, subscription={}",
        request.plan_id,
        subscription_id
    );

    Ok(Json(CreateSubscriptionResponse {
        success: true,
        subscription_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct SignalPaidResponse {
    pub order: Order,
}

/// Record the client's "I paid" claim: a `submitted` order plus a
/// `standard -> pending` entitlement move, atomically. The claim alone never
/// grants anything - confirmation still requires the webhook or an operator.
pub async fn signal_paid(
    State(state): State<AppState>,
    Json(request): Json<SignalPaidRequest>,
) -> Result<Json<SignalPaidResponse>> {
    request.validate()?;

    let mut conn = state.db.get()?;
    let order = submit_claim(&mut conn, request.email.trim(), request.signal_token.trim())?
        .or_not_found(msg::USER_NOT_FOUND)?;

    Ok(Json(SignalPaidResponse { order }))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub entitlement: Entitlement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entitlement_source_id: Option<String>,
    /// Most recent order of any status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_order: Option<Order>,
    /// Most recent approved order - the source of truth for any invoice view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_order: Option<Order>,
}

/// Server truth for the client poller. Each poll is one independent lookup.
pub async fn subscription_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<SubscriptionStatusResponse>> {
    let conn = state.db.get()?;

    let user = queries::get_user_by_email(&conn, query.email.trim())?
        .or_not_found(msg::USER_NOT_FOUND)?;

    let latest_order = queries::get_orders_for_user(&conn, &user.id)?.into_iter().next();
    let invoice_order = queries::latest_order_with_status(&conn, &user.id, OrderStatus::Approved)?;

    Ok(Json(SubscriptionStatusResponse {
        entitlement: user.entitlement,
        entitlement_source_id: user.entitlement_source_id,
        latest_order,
        invoice_order,
    }))
}
