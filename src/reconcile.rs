//! Reconciliation engine: the single authority over entitlement transitions.
//!
//! Three independently-arriving signals converge here - the client's "I
//! paid" claim, the gateway's signed webhook, and a manual operator audit.
//! Every mutation of the account + order pair runs inside one IMMEDIATE
//! SQLite transaction, so two near-simultaneous confirmations for the same
//! identity cannot both read `pending` and both apply the transition. The
//! net effect of any interleaving is a single grant attributed to whichever
//! confirmation landed first; everything later is a no-op.

use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::gateway::GATEWAY_PROVIDER;
use crate::models::{Entitlement, Order, OrderStatus};

use crate::error::Result;

/// Origin of a trusted signal that entitlement should advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    /// Authenticated payment-gateway webhook.
    Webhook,
    /// Operator decision. Trusted by virtue of being an authenticated
    /// operator action; bypasses signature checks.
    ManualAudit,
    /// Break-glass override, same trust basis as a manual audit.
    DirectOverride,
}

impl ConfirmationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationSource::Webhook => "webhook",
            ConfirmationSource::ManualAudit => "manual_audit",
            ConfirmationSource::DirectOverride => "direct_override",
        }
    }
}

/// Result of applying a confirmation. Exactly one of {no-op, single
/// transition} occurred by the time this is returned.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Entitlement moved to `pro`; the most recent submitted order (if any)
    /// was approved in the same transaction.
    Granted { approved_order_id: Option<String> },
    /// Idempotent replay: the account is already `pro` (or the webhook
    /// object id was already processed). Nothing changed.
    AlreadyGranted,
    /// Identity did not resolve. Nothing mutated; reported, not retried.
    UnknownUser,
}

/// Apply a confirmed payment signal to an account.
///
/// Storage failure rolls the whole transaction back and surfaces to the
/// caller; the operation is idempotent, so retrying the entire confirmation
/// is always safe.
pub fn apply_confirmation(
    conn: &mut Connection,
    email: &str,
    source: ConfirmationSource,
    source_reference: &str,
) -> Result<ConfirmationOutcome> {
    // IMMEDIATE takes the write lock up front: the per-identity mutual
    // exclusion the account+order dual update requires.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(user) = queries::get_user_by_email(&tx, email)? else {
        tracing::warn!(
            "confirmation for unknown user: email={}, source={}, reference={}",
            email,
            source.as_str(),
            source_reference
        );
        return Ok(ConfirmationOutcome::UnknownUser);
    };

    // First confirmation wins. A later confirmation never overwrites the
    // recorded source, never re-approves an order.
    if user.entitlement == Entitlement::Pro {
        return Ok(ConfirmationOutcome::AlreadyGranted);
    }

    // Webhook replay is additionally keyed by the gateway object id. Inside
    // the transaction: if the grant below fails, the ledger entry rolls back
    // with it and the gateway's retry can succeed.
    if source == ConfirmationSource::Webhook
        && !queries::try_record_webhook_event(&tx, GATEWAY_PROVIDER, source_reference)?
    {
        return Ok(ConfirmationOutcome::AlreadyGranted);
    }

    queries::set_entitlement(&tx, &user.id, Entitlement::Pro, Some(source_reference))?;

    let approved_order_id = match queries::latest_order_with_status(
        &tx,
        &user.id,
        OrderStatus::Submitted,
    )? {
        Some(order) => {
            let gateway_reference =
                (source == ConfirmationSource::Webhook).then_some(source_reference);
            queries::update_order_status(&tx, &order.id, OrderStatus::Approved, gateway_reference)?;
            Some(order.id)
        }
        None => None,
    };

    tx.commit()?;

    tracing::info!(
        "entitlement granted: email={}, source={}, reference={}, order={:?}",
        email,
        source.as_str(),
        source_reference,
        approved_order_id
    );

    Ok(ConfirmationOutcome::Granted { approved_order_id })
}

/// Result of a manual rejection.
#[derive(Debug, PartialEq, Eq)]
pub enum RejectionOutcome {
    /// The outstanding claim was rejected; a `pending` entitlement fell back
    /// to `standard`.
    Rejected { rejected_order_id: Option<String> },
    /// The account is already `pro`; rejection never regresses a grant.
    AlreadyGranted,
    UnknownUser,
}

/// Manually reject an outstanding "I paid" claim.
pub fn apply_rejection(conn: &mut Connection, email: &str) -> Result<RejectionOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(user) = queries::get_user_by_email(&tx, email)? else {
        return Ok(RejectionOutcome::UnknownUser);
    };

    if user.entitlement == Entitlement::Pro {
        return Ok(RejectionOutcome::AlreadyGranted);
    }

    let rejected_order_id =
        match queries::latest_order_with_status(&tx, &user.id, OrderStatus::Submitted)? {
            Some(order) => {
                queries::update_order_status(&tx, &order.id, OrderStatus::Rejected, None)?;
                Some(order.id)
            }
            None => None,
        };

    if user.entitlement == Entitlement::Pending {
        queries::set_entitlement(&tx, &user.id, Entitlement::Standard, None)?;
    }

    tx.commit()?;

    tracing::info!(
        "claim rejected: email={}, order={:?}",
        email,
        rejected_order_id
    );

    Ok(RejectionOutcome::Rejected { rejected_order_id })
}

/// Record a client "I paid" claim: create a `submitted` order and move a
/// `standard` entitlement to `pending`. The claim token is stored verbatim
/// and never trusted on its own - only a webhook or operator confirmation
/// can reach `pro`.
pub fn submit_claim(
    conn: &mut Connection,
    email: &str,
    claimed_signal_token: &str,
) -> Result<Option<Order>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(user) = queries::get_user_by_email(&tx, email)? else {
        return Ok(None);
    };

    let order = queries::create_order(&tx, &user.id, claimed_signal_token)?;

    if user.entitlement == Entitlement::Standard {
        queries::set_entitlement(&tx, &user.id, Entitlement::Pending, None)?;
    }

    tx.commit()?;

    tracing::info!("payment claim submitted: email={}, order={}", email, order.id);

    Ok(Some(order))
}
