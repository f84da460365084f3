//! Scamdex - scam registry backend with a one-time "Pro" upgrade over UPI.
//!
//! UPI bank transfers have no automated payment-confirmation webhook, so a
//! Pro purchase is reconciled from three independently-arriving signals: the
//! client's "I paid" claim, the payment gateway's signed webhook, and a
//! manual operator audit. The reconciliation engine in [`reconcile`] is the
//! single writer that folds them into one idempotent, monotonic entitlement
//! state; [`flow`] is the client-side polling state machine that converges
//! on it.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;
pub mod flow;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod reconcile;
