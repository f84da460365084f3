//! Payment-gateway webhook intake.
//!
//! Verification runs on the raw body bytes before anything is parsed: a bad
//! or missing signature is a 403 and the body is never interpreted. Once
//! authenticated, the embedded payment/subscription object is handed to the
//! reconciliation engine; replays and already-granted accounts come back as
//! no-ops, so the gateway may deliver at-least-once in any order.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::gateway::{parse_webhook_event, verify_webhook_signature, WebhookEvent, SIGNATURE_HEADER};
use crate::reconcile::{apply_confirmation, ConfirmationOutcome, ConfirmationSource};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/gateway", post(handle_gateway_webhook))
}

#[derive(Serialize)]
pub struct WebhookAck {
    status: &'static str,
}

const ACK: WebhookAck = WebhookAck { status: "ok" };

pub async fn handle_gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Forbidden)?;

    if !verify_webhook_signature(&state.webhook_secret, &body, signature) {
        // No detail about which part mismatched.
        return Err(AppError::Forbidden);
    }

    let (object_id, email) = match parse_webhook_event(&body)? {
        WebhookEvent::Confirmation { object_id, email } => (object_id, email),
        WebhookEvent::Ignored => return Ok(Json(ACK)),
    };

    let mut conn = state.db.get()?;
    match apply_confirmation(&mut conn, &email, ConfirmationSource::Webhook, &object_id)? {
        ConfirmationOutcome::Granted { approved_order_id } => {
            tracing::info!(
                "webhook confirmation applied: object={}, order={:?}",
                object_id,
                approved_order_id
            );
        }
        ConfirmationOutcome::AlreadyGranted => {
            tracing::debug!("webhook replay ignored: object={}", object_id);
        }
        // Reported, not retried: acknowledging stops the gateway from
        // redelivering an event that can never resolve.
        ConfirmationOutcome::UnknownUser => {
            tracing::warn!("webhook for unknown identity: object={}", object_id);
        }
    }

    Ok(Json(ACK))
}
