//! Test utilities and fixtures for Scamdex integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use sha2::Sha256;
use tower::ServiceExt;

pub use scamdex::crypto::hash_password;
pub use scamdex::db::{init_db, queries, AppState, DbPool};
pub use scamdex::error::{AppError, Result};
pub use scamdex::gateway::{SubscriptionGateway, SIGNATURE_HEADER};
pub use scamdex::handlers;
pub use scamdex::models::*;
pub use scamdex::reconcile::*;

/// Shared secret used for webhook signing in tests.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Subscription id the stub gateway hands out.
pub const STUB_SUBSCRIPTION_ID: &str = "sub_test_123";

/// Gateway stub: no network, deterministic ids, optional injected failure.
pub struct StubGateway {
    pub fail_with: Option<String>,
}

impl StubGateway {
    pub fn ok() -> Self {
        Self { fail_with: None }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
        }
    }
}

impl SubscriptionGateway for StubGateway {
    fn create_subscription<'a>(
        &'a self,
        _plan_id: &'a str,
        _email: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            match &self.fail_with {
                Some(message) => Err(AppError::UpstreamGateway(message.clone())),
                None => Ok(STUB_SUBSCRIPTION_ID.to_string()),
            }
        })
    }
}

/// Pool over a unique temp file so every pooled connection sees one database.
fn test_pool() -> DbPool {
    let path = std::env::temp_dir().join(format!("scamdex-test-{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&path);
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

pub fn test_state() -> AppState {
    test_state_with_gateway(StubGateway::ok())
}

pub fn test_state_with_gateway(gateway: StubGateway) -> AppState {
    AppState {
        db: test_pool(),
        gateway: Arc::new(gateway),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        otp_ttl_secs: 300,
    }
}

/// Full application router over the test state.
pub fn app(state: AppState) -> Router {
    handlers::router().with_state(state)
}

/// Create a registered account with the default test password.
pub fn create_test_user(state: &AppState, email: &str) -> User {
    let conn = state.db.get().unwrap();
    queries::create_user(&conn, "Test User", email, &hash_password("password123")).unwrap()
}

pub fn get_user(state: &AppState, email: &str) -> User {
    let conn = state.db.get().unwrap();
    queries::get_user_by_email(&conn, email).unwrap().unwrap()
}

pub fn orders_for(state: &AppState, user_id: &str) -> Vec<Order> {
    let conn = state.db.get().unwrap();
    queries::get_orders_for_user(&conn, user_id).unwrap()
}

/// HMAC-SHA256 hex signature, as the gateway computes it.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// POST a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// POST a raw webhook body with a signature header.
pub async fn post_webhook(
    app: Router,
    body: &[u8],
    signature: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/gateway")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header(SIGNATURE_HEADER, sig);
    }
    app.oneshot(builder.body(Body::from(body.to_vec())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
