//! Scam registry: the free lookup surface and user reports.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::models::{ReportScamRequest, ScamRecord, REPORTED_CITY_TAG, REPORTED_RISK_SCORE};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scams", get(list_scams))
        .route("/scams/report", post(report_scam))
}

#[derive(Debug, Default, Deserialize)]
pub struct ScamQuery {
    #[serde(default)]
    pub query: Option<String>,
}

/// Case-insensitive substring search over registry identifiers.
pub async fn list_scams(
    State(state): State<AppState>,
    Query(params): Query<ScamQuery>,
) -> Result<Json<Vec<ScamRecord>>> {
    let conn = state.db.get()?;
    let records = queries::list_scams(&conn, params.query.as_deref())?;
    Ok(Json(records))
}

/// User-submitted report. Lands with the default risk score and the
/// "Reported" city tag until an analyst reviews it.
pub async fn report_scam(
    State(state): State<AppState>,
    Json(request): Json<ReportScamRequest>,
) -> Result<(StatusCode, Json<ScamRecord>)> {
    request.validate()?;

    let conn = state.db.get()?;
    let record = queries::insert_scam(
        &conn,
        request.kind.trim(),
        request.value.trim(),
        request.description.trim(),
        REPORTED_RISK_SCORE,
        REPORTED_CITY_TAG,
    )?;

    tracing::info!("scam reported: kind={}, identifier={}", record.kind, record.identifier);

    Ok((StatusCode::CREATED, Json(record)))
}
