pub mod auth;
pub mod scams;
pub mod subscriptions;
pub mod webhooks;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The full HTTP surface. Shared by `main` and the integration tests.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(subscriptions::router())
        .merge(scams::router())
        .merge(webhooks::router())
}
