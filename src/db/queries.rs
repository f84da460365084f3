use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{msg, AppError, Result};
use crate::models::*;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let entitlement: String = row.get("entitlement")?;
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        password_hash: row.get("password_hash")?,
        // CHECK constraint guarantees the column holds a known value
        entitlement: Entitlement::parse(&entitlement).unwrap_or(Entitlement::Standard),
        entitlement_source_id: row.get("entitlement_source_id")?,
        created_at: row.get("created_at")?,
    })
}

const USER_COLS: &str = "id, email, name, password_hash, entitlement, entitlement_source_id, created_at";

/// Create an account with `standard` entitlement. A duplicate email maps to
/// a 400 (the status code is part of the register contract).
pub fn create_user(conn: &Connection, name: &str, email: &str, password_hash: &str) -> Result<User> {
    let id = gen_id();
    let created_at = now();

    let result = conn.execute(
        "INSERT INTO users (id, email, name, password_hash, entitlement, created_at)
         VALUES (?1, ?2, ?3, ?4, 'standard', ?5)",
        params![id, email, name, password_hash, created_at],
    );

    match result {
        Ok(_) => Ok(User {
            id,
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            entitlement: Entitlement::Standard,
            entitlement_source_id: None,
            created_at,
        }),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::BadRequest(msg::DUPLICATE_EMAIL.into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
            params![email],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Raw entitlement write. Only the reconciliation engine (and its rejection
/// path) may call this; everything else goes through `reconcile`.
pub fn set_entitlement(
    conn: &Connection,
    user_id: &str,
    entitlement: Entitlement,
    source_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE users SET entitlement = ?1, entitlement_source_id = ?2 WHERE id = ?3",
        params![entitlement.as_str(), source_id, user_id],
    )?;
    Ok(())
}

// ============ Orders ============

fn map_order(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get("status")?;
    Ok(Order {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Submitted),
        claimed_signal_token: row.get("claimed_signal_token")?,
        gateway_reference: row.get("gateway_reference")?,
        created_at: row.get("created_at")?,
    })
}

const ORDER_COLS: &str = "id, user_id, status, claimed_signal_token, gateway_reference, created_at";

pub fn create_order(conn: &Connection, user_id: &str, claimed_signal_token: &str) -> Result<Order> {
    let id = gen_id();
    let created_at = now();

    conn.execute(
        "INSERT INTO orders (id, user_id, status, claimed_signal_token, created_at)
         VALUES (?1, ?2, 'submitted', ?3, ?4)",
        params![id, user_id, claimed_signal_token, created_at],
    )?;

    Ok(Order {
        id,
        user_id: user_id.to_string(),
        status: OrderStatus::Submitted,
        claimed_signal_token: claimed_signal_token.to_string(),
        gateway_reference: None,
        created_at,
    })
}

/// All orders for a user, newest first (rowid breaks same-second ties).
pub fn get_orders_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
    ))?;
    let orders = stmt
        .query_map(params![user_id], map_order)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(orders)
}

pub fn latest_order_with_status(
    conn: &Connection,
    user_id: &str,
    status: OrderStatus,
) -> Result<Option<Order>> {
    let order = conn
        .query_row(
            &format!(
                "SELECT {ORDER_COLS} FROM orders
                 WHERE user_id = ?1 AND status = ?2
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![user_id, status.as_str()],
            map_order,
        )
        .optional()?;
    Ok(order)
}

pub fn get_order_by_id(conn: &Connection, order_id: &str) -> Result<Option<Order>> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLS} FROM orders WHERE id = ?1"),
            params![order_id],
            map_order,
        )
        .optional()?;
    Ok(order)
}

/// Transition an order out of `submitted`. The WHERE clause enforces the only
/// legal transitions (`submitted -> approved`, `submitted -> rejected`);
/// returns false if the order was not in `submitted`, so a terminal status is
/// never overwritten.
pub fn update_order_status(
    conn: &Connection,
    order_id: &str,
    status: OrderStatus,
    gateway_reference: Option<&str>,
) -> Result<bool> {
    debug_assert!(status != OrderStatus::Submitted);
    let affected = conn.execute(
        "UPDATE orders
         SET status = ?1, gateway_reference = COALESCE(?2, gateway_reference)
         WHERE id = ?3 AND status = 'submitted'",
        params![status.as_str(), gateway_reference, order_id],
    )?;
    Ok(affected > 0)
}

// ============ Webhook replay ledger ============

/// Record a webhook event id. Returns true if this is the first time the id
/// was seen (the caller may apply side effects), false on replay.
pub fn try_record_webhook_event(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (provider, event_id, created_at) VALUES (?1, ?2, ?3)",
        params![provider, event_id, now()],
    )?;
    Ok(affected > 0)
}

// ============ Scam registry ============

fn map_scam(row: &Row<'_>) -> rusqlite::Result<ScamRecord> {
    Ok(ScamRecord {
        id: row.get("id")?,
        kind: row.get("kind")?,
        identifier: row.get("identifier")?,
        description: row.get("description")?,
        risk_score: row.get("risk_score")?,
        city_tag: row.get("city_tag")?,
        created_at: row.get("created_at")?,
    })
}

const SCAM_COLS: &str = "id, kind, identifier, description, risk_score, city_tag, created_at";

pub fn insert_scam(
    conn: &Connection,
    kind: &str,
    identifier: &str,
    description: &str,
    risk_score: i32,
    city_tag: &str,
) -> Result<ScamRecord> {
    let id = gen_id();
    let created_at = now();

    conn.execute(
        "INSERT INTO scam_registry (id, kind, identifier, description, risk_score, city_tag, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, kind, identifier, description, risk_score, city_tag, created_at],
    )?;

    Ok(ScamRecord {
        id,
        kind: kind.to_string(),
        identifier: identifier.to_string(),
        description: description.to_string(),
        risk_score,
        city_tag: city_tag.to_string(),
        created_at,
    })
}

/// Case-insensitive substring match on the identifier. `instr` instead of
/// LIKE so `%`/`_` in user input are matched literally.
pub fn list_scams(conn: &Connection, query: Option<&str>) -> Result<Vec<ScamRecord>> {
    let mut stmt;
    let rows = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            stmt = conn.prepare(&format!(
                "SELECT {SCAM_COLS} FROM scam_registry
                 WHERE instr(lower(identifier), lower(?1)) > 0
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            stmt.query_map(params![q], map_scam)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            stmt = conn.prepare(&format!(
                "SELECT {SCAM_COLS} FROM scam_registry ORDER BY created_at DESC, rowid DESC"
            ))?;
            stmt.query_map([], map_scam)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    Ok(rows)
}

// ============ OTP sessions ============

fn map_otp(row: &Row<'_>) -> rusqlite::Result<OtpSession> {
    Ok(OtpSession {
        email: row.get("email")?,
        code_hash: row.get("code_hash")?,
        expires_at: row.get("expires_at")?,
        created_at: row.get("created_at")?,
    })
}

/// Create (or replace) the verification session for an email. Expiry is
/// absolute: creation + TTL, never extended afterwards.
pub fn create_otp_session(
    conn: &Connection,
    email: &str,
    code_hash: &str,
    ttl_secs: i64,
) -> Result<OtpSession> {
    let created_at = now();
    let expires_at = created_at + ttl_secs;

    conn.execute(
        "INSERT OR REPLACE INTO otp_sessions (email, code_hash, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![email, code_hash, expires_at, created_at],
    )?;

    Ok(OtpSession {
        email: email.to_string(),
        code_hash: code_hash.to_string(),
        expires_at,
        created_at,
    })
}

/// Look up the live session for an email. An expired session behaves as
/// "not found" and is pruned here, at read time - there is no background
/// sweep.
pub fn get_otp_session(conn: &Connection, email: &str) -> Result<Option<OtpSession>> {
    let session = conn
        .query_row(
            "SELECT email, code_hash, expires_at, created_at FROM otp_sessions WHERE email = ?1",
            params![email],
            map_otp,
        )
        .optional()?;

    match session {
        Some(s) if s.is_expired(now()) => {
            clear_otp_session(conn, email)?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// Remove a session (on successful verification or explicit invalidation).
pub fn clear_otp_session(conn: &Connection, email: &str) -> Result<()> {
    conn.execute("DELETE FROM otp_sessions WHERE email = ?1", params![email])?;
    Ok(())
}
