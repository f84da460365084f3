//! Payment gateway boundary: webhook authentication and the subscription API
//! client.
//!
//! The gateway's object model is consumed as an opaque signed-event source.
//! Webhook authentication is a pure predicate over the byte-exact request
//! body - re-serializing a parsed object is unsafe (key order or whitespace
//! may differ from what was signed), so verification always runs on the raw
//! bytes before the body is interpreted at all.

use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Provider key for the webhook replay ledger.
pub const GATEWAY_PROVIDER: &str = "gateway";

/// Header carrying the gateway's claimed signature.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Verify a webhook body against its claimed signature.
///
/// Computes HMAC-SHA256 over the exact serialized body with the shared
/// secret and compares hex digests in constant time. Pure predicate: no
/// state is touched, and the return value carries no hint of which part
/// mismatched.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Length check is not constant-time, but the length is not secret -
    // a real signature is always 64 hex chars.
    if expected.len() != signature.len() {
        return false;
    }

    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// A webhook event reduced to what the reconciliation engine needs.
#[derive(Debug)]
pub enum WebhookEvent {
    /// `subscription.activated` or `payment.captured`: a confirmed payment
    /// object for the embedded identity.
    Confirmation {
        /// Gateway object id (payment or subscription). Idempotency key.
        object_id: String,
        /// Account identity embedded in the object's notes.
        email: String,
    },
    /// Event type not relevant to entitlement management.
    Ignored,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EntityWrapper {
    entity: GatewayEntity,
}

#[derive(Debug, Deserialize)]
struct GatewayEntity {
    id: String,
    #[serde(default)]
    notes: EntityNotes,
}

#[derive(Debug, Default, Deserialize)]
struct EntityNotes {
    #[serde(default)]
    email: Option<String>,
}

/// Parse an authenticated webhook body into a [`WebhookEvent`].
///
/// Only called after signature verification accepted the raw bytes.
pub fn parse_webhook_event(body: &[u8]) -> Result<WebhookEvent> {
    let envelope: EventEnvelope = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let object_key = match envelope.event.as_str() {
        "payment.captured" => "payment",
        "subscription.activated" => "subscription",
        _ => return Ok(WebhookEvent::Ignored),
    };

    let wrapper: EntityWrapper =
        serde_json::from_value(envelope.payload.get(object_key).cloned().unwrap_or_default())
            .map_err(|e| AppError::BadRequest(format!("Invalid {} entity: {}", object_key, e)))?;

    let email = wrapper
        .entity
        .notes
        .email
        .ok_or_else(|| AppError::BadRequest("Missing identity in event notes".into()))?;

    Ok(WebhookEvent::Confirmation {
        object_id: wrapper.entity.id,
        email,
    })
}

/// Card/autopay subscriptions go through the gateway's REST API - the one
/// purchase path that does get a verifiable webhook later.
pub trait SubscriptionGateway: Send + Sync {
    /// Create a subscription for a plan, returning the gateway's
    /// subscription id.
    fn create_subscription<'a>(
        &'a self,
        plan_id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<String>>;
}

/// HTTP implementation of [`SubscriptionGateway`].
pub struct HttpGateway {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(api_base: &str, key_id: &str, key_secret: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionResponse {
    id: String,
}

impl SubscriptionGateway for HttpGateway {
    fn create_subscription<'a>(
        &'a self,
        plan_id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let response = self
                .client
                .post(format!("{}/v1/subscriptions", self.api_base))
                .basic_auth(&self.key_id, Some(&self.key_secret))
                .json(&serde_json::json!({
                    "plan_id": plan_id,
                    "customer_notify": 1,
                    "notes": { "email": email },
                }))
                .send()
                .await
                .map_err(|e| AppError::UpstreamGateway(e.to_string()))?;

            if !response.status().is_success() {
                // Pass the gateway's message through for operator visibility;
                // no local state was committed, so the client may retry.
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "gateway request failed".to_string());
                return Err(AppError::UpstreamGateway(message));
            }

            let created: CreateSubscriptionResponse = response
                .json()
                .await
                .map_err(|e| AppError::UpstreamGateway(e.to_string()))?;

            Ok(created.id)
        })
    }
}
