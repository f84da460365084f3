use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error message constants shared between handlers and tests.
pub mod msg {
    pub const USER_NOT_FOUND: &str = "User not found";
    pub const ORDER_NOT_FOUND: &str = "Order not found";
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const NAME_EMPTY: &str = "Name cannot be empty";
    pub const PASSWORD_EMPTY: &str = "Password cannot be empty";
    pub const PLAN_ID_EMPTY: &str = "Plan id cannot be empty";
    pub const SIGNAL_TOKEN_EMPTY: &str = "Signal token cannot be empty";
    pub const DUPLICATE_EMAIL: &str = "An account with this email already exists";
    pub const IDENTIFIER_EMPTY: &str = "Identifier cannot be empty";
    pub const OTP_CODE_EMPTY: &str = "Code cannot be empty";
    pub const SCAM_TYPE_EMPTY: &str = "Type cannot be empty";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Invalid credentials or bad webhook signature. Never carries detail
    /// about which factor failed.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    /// Payment gateway failure. The gateway's message is passed through for
    /// operator visibility; no partial state was committed, so the client
    /// may retry the whole flow.
    #[error("Gateway error: {0}")]
    UpstreamGateway(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "Not found", Some(m.clone())),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, "Bad request", Some(m.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden", None),
            AppError::UpstreamGateway(m) => {
                tracing::error!("Gateway error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, "Gateway error", Some(m.clone()))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(m) => {
                tracing::error!("Internal error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Lifts `Option<T>` into `Result<T>` with a 404.
pub trait OptionExt<T> {
    fn or_not_found(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(msg.to_string()))
    }
}
