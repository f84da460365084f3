//! Account endpoints: registration, login, and the operator audit paths.
//!
//! `/auth/upgrade` and `/auth/reject` are the manual-audit intake: an
//! operator decision is a fourth trusted signal source, routed through the
//! same reconciliation engine as the webhook path so the single-writer
//! invariant holds. Operator authentication itself is handled upstream and
//! out of scope here.

use axum::{extract::State, routing::post, Router};
use uuid::Uuid;

use serde::Serialize;

use crate::crypto::{generate_otp_code, hash_password, verify_password};
use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{
    IdentityRequest, LoginRequest, OrderStatus, OtpVerifyRequest, RegisterRequest, SanitizedUser,
};
use crate::reconcile::{
    apply_confirmation, apply_rejection, ConfirmationOutcome, ConfirmationSource, RejectionOutcome,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/upgrade", post(upgrade))
        .route("/auth/reject", post(reject))
        .route("/auth/otp/request", post(request_otp))
        .route("/auth/otp/verify", post(verify_otp))
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<SanitizedUser>> {
    request.validate()?;

    let conn = state.db.get()?;
    let password_hash = hash_password(&request.password);
    // Duplicate email maps to 400 inside create_user.
    let user = queries::create_user(&conn, request.name.trim(), request.email.trim(), &password_hash)?;

    tracing::info!("user registered: {}", user.email);

    Ok(Json(user.into()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SanitizedUser>> {
    let conn = state.db.get()?;

    // Never reveals which factor failed.
    let user = queries::get_user_by_email(&conn, request.email.trim())?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    Ok(Json(user.into()))
}

#[derive(Serialize)]
pub struct OtpRequestedResponse {
    status: &'static str,
}

/// Start an email verification: mint a code, store its hash with the
/// configured TTL, and hand the plaintext to the delivery provider. The
/// response is identical whether or not the account exists.
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<OtpRequestedResponse>> {
    request.validate()?;
    let email = request.email.trim();

    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, email)?.is_some() {
        let code = generate_otp_code();
        queries::create_otp_session(&conn, email, &hash_password(&code), state.otp_ttl_secs)?;
        // Delivery is out of band. Until a provider is wired in, the dev log
        // line is the only place the plaintext code surfaces.
        tracing::debug!("otp issued: email={}, code={}", email, code);
    }

    Ok(Json(OtpRequestedResponse { status: "sent" }))
}

/// Complete an email verification. A missing, expired, or mismatched session
/// all come back as the same 401; success burns the session.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<OtpVerifyRequest>,
) -> Result<Json<SanitizedUser>> {
    request.validate()?;
    let email = request.email.trim();

    let conn = state.db.get()?;

    // Expired sessions are pruned at read time inside get_otp_session.
    let session = queries::get_otp_session(&conn, email)?.ok_or(AppError::Unauthorized)?;

    if !verify_password(request.code.trim(), &session.code_hash) {
        return Err(AppError::Unauthorized);
    }

    queries::clear_otp_session(&conn, email)?;

    let user = queries::get_user_by_email(&conn, email)?.ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}

/// Manual-audit confirmation: the operator verified the bank transfer and
/// marks the entitlement active. Bypasses webhook signature checks by design.
pub async fn upgrade(
    State(state): State<AppState>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<SanitizedUser>> {
    request.validate()?;
    let email = request.email.trim();

    let mut conn = state.db.get()?;

    // Prefer the outstanding order as the recorded source; synthesize a
    // reference when the operator confirms a user who never signalled.
    let source_reference = match queries::get_user_by_email(&conn, email)? {
        Some(user) => queries::latest_order_with_status(&conn, &user.id, OrderStatus::Submitted)?
            .map(|o| o.id)
            .unwrap_or_else(|| format!("manual_{}", Uuid::new_v4())),
        None => return Err(AppError::NotFound(msg::USER_NOT_FOUND.into())),
    };

    match apply_confirmation(
        &mut conn,
        email,
        ConfirmationSource::ManualAudit,
        &source_reference,
    )? {
        ConfirmationOutcome::UnknownUser => Err(AppError::NotFound(msg::USER_NOT_FOUND.into())),
        ConfirmationOutcome::Granted { .. } | ConfirmationOutcome::AlreadyGranted => {
            let user = queries::get_user_by_email(&conn, email)?
                .ok_or_else(|| AppError::NotFound(msg::USER_NOT_FOUND.into()))?;
            Ok(Json(user.into()))
        }
    }
}

/// Manual-audit rejection: the claimed payment was not found in the bank
/// statement. `pending` falls back to `standard`; a granted account is never
/// touched.
pub async fn reject(
    State(state): State<AppState>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<SanitizedUser>> {
    request.validate()?;
    let email = request.email.trim();

    let mut conn = state.db.get()?;

    match apply_rejection(&mut conn, email)? {
        RejectionOutcome::UnknownUser => Err(AppError::NotFound(msg::USER_NOT_FOUND.into())),
        RejectionOutcome::Rejected { .. } | RejectionOutcome::AlreadyGranted => {
            let user = queries::get_user_by_email(&conn, email)?
                .ok_or_else(|| AppError::NotFound(msg::USER_NOT_FOUND.into()))?;
            Ok(Json(user.into()))
        }
    }
}
