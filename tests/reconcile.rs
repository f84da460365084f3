//! Reconciliation engine invariants: exactly-once grants, idempotent
//! replays, first-confirmation-wins, and legal order transitions.

mod common;

use common::*;

#[test]
fn grant_is_idempotent_under_replay() {
    let state = test_state();
    let user = create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    submit_claim(&mut conn, "a@x.com", "TXN123").unwrap().unwrap();

    let first =
        apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::Webhook, "pay_1").unwrap();
    assert!(matches!(first, ConfirmationOutcome::Granted { approved_order_id: Some(_) }));

    let after_first = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();

    let replay =
        apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::Webhook, "pay_1").unwrap();
    assert_eq!(replay, ConfirmationOutcome::AlreadyGranted);

    let after_replay = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(after_replay.entitlement, Entitlement::Pro);
    assert_eq!(after_replay.entitlement_source_id, after_first.entitlement_source_id);
    assert_eq!(after_replay.entitlement_source_id.as_deref(), Some("pay_1"));

    // No duplicate order approval.
    let orders = queries::get_orders_for_user(&conn, &user.id).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Approved);
    assert_eq!(orders[0].gateway_reference.as_deref(), Some("pay_1"));
}

#[test]
fn unknown_user_mutates_nothing() {
    let state = test_state();
    let mut conn = state.db.get().unwrap();

    let outcome =
        apply_confirmation(&mut conn, "ghost@x.com", ConfirmationSource::Webhook, "pay_9").unwrap();
    assert_eq!(outcome, ConfirmationOutcome::UnknownUser);

    // The replay ledger rolled back with the transaction: the same object id
    // is still fresh for a later valid confirmation.
    assert!(queries::try_record_webhook_event(&conn, "gateway", "pay_9").unwrap());
}

#[test]
fn first_confirmation_wins_manual_then_webhook() {
    let state = test_state();
    create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    let order = submit_claim(&mut conn, "a@x.com", "TXN1").unwrap().unwrap();

    let manual = apply_confirmation(
        &mut conn,
        "a@x.com",
        ConfirmationSource::ManualAudit,
        &order.id,
    )
    .unwrap();
    assert!(matches!(manual, ConfirmationOutcome::Granted { .. }));

    let webhook =
        apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::Webhook, "pay_7").unwrap();
    assert_eq!(webhook, ConfirmationOutcome::AlreadyGranted);

    let user = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(user.entitlement, Entitlement::Pro);
    // Attributed to whichever source reached the engine first.
    assert_eq!(user.entitlement_source_id.as_deref(), Some(order.id.as_str()));
}

#[test]
fn first_confirmation_wins_webhook_then_manual() {
    let state = test_state();
    create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    submit_claim(&mut conn, "a@x.com", "TXN1").unwrap().unwrap();

    apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::Webhook, "pay_7").unwrap();
    let manual = apply_confirmation(
        &mut conn,
        "a@x.com",
        ConfirmationSource::ManualAudit,
        "manual_followup",
    )
    .unwrap();
    assert_eq!(manual, ConfirmationOutcome::AlreadyGranted);

    let user = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(user.entitlement_source_id.as_deref(), Some("pay_7"));
}

#[test]
fn confirmation_without_outstanding_order_still_grants() {
    let state = test_state();
    create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    let outcome =
        apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::DirectOverride, "ovr_1")
            .unwrap();
    assert_eq!(
        outcome,
        ConfirmationOutcome::Granted {
            approved_order_id: None
        }
    );

    let user = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(user.entitlement, Entitlement::Pro);
}

#[test]
fn submit_claim_moves_standard_to_pending() {
    let state = test_state();
    let user = create_test_user(&state, "a@x.com");
    assert_eq!(user.entitlement, Entitlement::Standard);

    let mut conn = state.db.get().unwrap();
    let order = submit_claim(&mut conn, "a@x.com", "TXN1").unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Submitted);
    assert_eq!(order.claimed_signal_token, "TXN1");

    let user = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(user.entitlement, Entitlement::Pending);

    // Unknown identity: no order, nothing mutated.
    assert!(submit_claim(&mut conn, "ghost@x.com", "TXN2").unwrap().is_none());
}

#[test]
fn rejection_returns_pending_to_standard() {
    let state = test_state();
    let user = create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    let order = submit_claim(&mut conn, "a@x.com", "TXN1").unwrap().unwrap();

    let outcome = apply_rejection(&mut conn, "a@x.com").unwrap();
    assert_eq!(
        outcome,
        RejectionOutcome::Rejected {
            rejected_order_id: Some(order.id.clone())
        }
    );

    let refreshed = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(refreshed.entitlement, Entitlement::Standard);

    let orders = queries::get_orders_for_user(&conn, &user.id).unwrap();
    assert_eq!(orders[0].status, OrderStatus::Rejected);
}

#[test]
fn rejection_never_regresses_a_grant() {
    let state = test_state();
    create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::Webhook, "pay_1").unwrap();

    let outcome = apply_rejection(&mut conn, "a@x.com").unwrap();
    assert_eq!(outcome, RejectionOutcome::AlreadyGranted);

    let user = queries::get_user_by_email(&conn, "a@x.com").unwrap().unwrap();
    assert_eq!(user.entitlement, Entitlement::Pro);
}

#[test]
fn approved_is_terminal() {
    let state = test_state();
    let user = create_test_user(&state, "a@x.com");

    let conn = state.db.get().unwrap();
    let order = queries::create_order(&conn, &user.id, "TXN1").unwrap();

    assert!(queries::update_order_status(&conn, &order.id, OrderStatus::Approved, Some("pay_1")).unwrap());
    // No further transition out of approved.
    assert!(!queries::update_order_status(&conn, &order.id, OrderStatus::Rejected, None).unwrap());
    assert!(!queries::update_order_status(&conn, &order.id, OrderStatus::Approved, Some("pay_2")).unwrap());

    let refreshed = queries::get_order_by_id(&conn, &order.id).unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatus::Approved);
    assert_eq!(refreshed.gateway_reference.as_deref(), Some("pay_1"));
}

#[test]
fn latest_submitted_order_is_the_one_approved() {
    let state = test_state();
    let user = create_test_user(&state, "a@x.com");

    let mut conn = state.db.get().unwrap();
    let first = submit_claim(&mut conn, "a@x.com", "TXN_OLD").unwrap().unwrap();
    let second = submit_claim(&mut conn, "a@x.com", "TXN_NEW").unwrap().unwrap();

    let outcome =
        apply_confirmation(&mut conn, "a@x.com", ConfirmationSource::Webhook, "pay_1").unwrap();
    assert_eq!(
        outcome,
        ConfirmationOutcome::Granted {
            approved_order_id: Some(second.id.clone())
        }
    );

    let orders = queries::get_orders_for_user(&conn, &user.id).unwrap();
    let old = orders.iter().find(|o| o.id == first.id).unwrap();
    assert_eq!(old.status, OrderStatus::Submitted);
}
