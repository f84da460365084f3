use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// Order status. Only `Submitted -> Approved` and `Submitted -> Rejected`
/// are legal; `Approved` is terminal. Enforced by
/// [`crate::db::queries::update_order_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Submitted,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Submitted => "submitted",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(OrderStatus::Submitted),
            "approved" => Some(OrderStatus::Approved),
            "rejected" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }
}

/// One purchase attempt. Tracked independently of the entitlement so history
/// and invoicing survive entitlement changes. The most recent approved order
/// is the source of truth for any invoice view.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    /// Client-supplied opaque string asserting payment occurred. Stored
    /// verbatim; never trusted for entitlement on its own.
    pub claimed_signal_token: String,
    /// External payment/subscription id, set once a webhook confirms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignalPaidRequest {
    pub email: String,
    pub signal_token: String,
}

impl SignalPaidRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
        }
        if self.signal_token.trim().is_empty() {
            return Err(AppError::BadRequest(msg::SIGNAL_TOKEN_EMPTY.into()));
        }
        Ok(())
    }
}
