use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// Risk score assigned to user-reported entries until an analyst reviews them.
pub const REPORTED_RISK_SCORE: i32 = 50;

/// City tag for user-reported entries that carry no verified location.
pub const REPORTED_CITY_TAG: &str = "Reported";

#[derive(Debug, Clone, Serialize)]
pub struct ScamRecord {
    pub id: String,
    /// Kind of identifier: "upi", "phone", "url", ...
    #[serde(rename = "type")]
    pub kind: String,
    /// The identifier itself (UPI handle, phone number, URL).
    pub identifier: String,
    pub description: String,
    pub risk_score: i32,
    pub city_tag: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReportScamRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

impl ReportScamRequest {
    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(AppError::BadRequest(msg::SCAM_TYPE_EMPTY.into()));
        }
        if self.value.trim().is_empty() {
            return Err(AppError::BadRequest(msg::IDENTIFIER_EMPTY.into()));
        }
        Ok(())
    }
}
