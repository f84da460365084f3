use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// Basic email format validation.
///
/// Intentionally permissive - a sanity check, not RFC 5322. The email is the
/// account's primary key, so the main goal is rejecting obvious garbage
/// before it becomes an identity.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() || local.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// The account's access tier. Moves `Standard -> Pending -> Pro`, or
/// `Pending -> Standard` on manual rejection. `Pro` never regresses
/// implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entitlement {
    Standard,
    Pending,
    Pro,
}

impl Entitlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::Standard => "standard",
            Entitlement::Pending => "pending",
            Entitlement::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Entitlement::Standard),
            "pending" => Some(Entitlement::Pending),
            "pro" => Some(Entitlement::Pro),
            _ => None,
        }
    }
}

/// Full account row. Holds the password hash, so it never crosses the HTTP
/// boundary - handlers return [`SanitizedUser`] instead.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub entitlement: Entitlement,
    /// Order/payment object that most recently caused an entitlement
    /// transition. Set exactly once, by the first confirmation to land.
    pub entitlement_source_id: Option<String>,
    pub created_at: i64,
}

/// The only user shape that leaves the boundary. No password field exists at
/// the type level, so no serialization path can leak it.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub entitlement: Entitlement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entitlement_source_id: Option<String>,
    pub created_at: i64,
}

impl From<User> for SanitizedUser {
    fn from(u: User) -> Self {
        SanitizedUser {
            id: u.id,
            email: u.email,
            name: u.name,
            entitlement: u.entitlement,
            entitlement_source_id: u.entitlement_source_id,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        if self.password.is_empty() {
            return Err(AppError::BadRequest(msg::PASSWORD_EMPTY.into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    pub email: String,
}

impl IdentityRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
        }
        Ok(())
    }
}
