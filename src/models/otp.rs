use serde::Deserialize;

use crate::error::{msg, AppError, Result};

/// Ephemeral email-verification session.
///
/// Keyed by email with an absolute expiry instant (creation + fixed TTL).
/// The session store is the sole owner: any lookup past `expires_at` behaves
/// as "not found" and prunes the row at read time, and the row is cleared on
/// successful verification or explicit invalidation. Code delivery is an
/// external collaborator.
#[derive(Debug, Clone)]
pub struct OtpSession {
    pub email: String,
    /// Salted hash of the code; the plaintext code exists only in transit.
    pub code_hash: String,
    pub expires_at: i64,
    pub created_at: i64,
}

impl OtpSession {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

impl OtpVerifyRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
        }
        if self.code.trim().is_empty() {
            return Err(AppError::BadRequest(msg::OTP_CODE_EMPTY.into()));
        }
        Ok(())
    }
}
