//! Client-side upgrade flow: `Plans -> Gateway -> Pending -> Success`.
//!
//! The flow never infers success from elapsed time. `Pending -> Success`
//! happens only when a poll of server truth observes a `pro` entitlement;
//! transient poll failures are silently retried on the next tick and never
//! regress the phase. The async driver is an explicit scheduled task with a
//! cancellation handle, so tearing down the owning context stops scheduling
//! further ticks instead of leaking timers.

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::Entitlement;

/// Fixed polling interval against server truth.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial plan selection.
    Plans,
    /// QR / UPI handle displayed, waiting for the user to pay.
    Gateway,
    /// User asserted payment; polling server truth.
    Pending,
    /// Terminal. Entitlement observed as `pro`.
    Success,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    /// "Signal paid" requires a resolvable account identity; without one the
    /// action fails and the phase does not advance.
    #[error("no resolvable account identity")]
    IdentityLost,
}

/// Locally persisted state trusted for initial placement only. Server truth
/// is still re-confirmed before anything depends on the entitlement.
#[derive(Debug, Clone, Default)]
pub struct CachedState {
    pub entitlement: Option<Entitlement>,
    /// An order was submitted and its outcome not yet observed.
    pub outstanding_claim: bool,
}

/// The upgrade flow state machine. Phases only move forward.
#[derive(Debug)]
pub struct UpgradeFlow {
    phase: Phase,
}

impl UpgradeFlow {
    pub fn new() -> Self {
        Self { phase: Phase::Plans }
    }

    /// Place the flow from cached local state: a cached `pro` starts
    /// directly in `Success`, a cached outstanding submission in `Pending`,
    /// anything else at `Plans`.
    pub fn resume(cached: &CachedState) -> Self {
        let phase = if cached.entitlement == Some(Entitlement::Pro) {
            Phase::Success
        } else if cached.outstanding_claim {
            Phase::Pending
        } else {
            Phase::Plans
        };
        Self { phase }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `Plans -> Gateway`: the user picked the Pro plan and the UPI handle /
    /// QR is displayed.
    pub fn open_gateway(&mut self) {
        if self.phase == Phase::Plans {
            self.phase = Phase::Gateway;
        }
    }

    /// `Gateway -> Pending` on an "I paid" action. The caller is expected to
    /// have created the server-side order; a missing identity fails the
    /// action without advancing.
    pub fn signal_paid(&mut self, identity: Option<&str>) -> std::result::Result<(), FlowError> {
        let identity = identity.map(str::trim).filter(|s| !s.is_empty());
        if identity.is_none() {
            return Err(FlowError::IdentityLost);
        }
        if self.phase == Phase::Gateway {
            self.phase = Phase::Pending;
        }
        Ok(())
    }

    /// Feed one poll result. Advances `Pending -> Success` only on an
    /// observed `pro`; a failed poll is a silent retry, and nothing ever
    /// moves the phase backwards.
    pub fn observe<E>(&mut self, poll: std::result::Result<Entitlement, E>) -> Phase {
        if self.phase == Phase::Pending && matches!(poll, Ok(Entitlement::Pro)) {
            self.phase = Phase::Success;
        }
        self.phase
    }
}

impl Default for UpgradeFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running entitlement poller.
pub struct Poller {
    shutdown: watch::Sender<bool>,
    phase: watch::Receiver<Phase>,
    task: JoinHandle<()>,
}

impl Poller {
    /// Last phase the poller reported.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Stop scheduling further ticks. A poll already in flight finishes; no
    /// new one starts.
    pub fn cancel(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the poller exits (success or cancellation).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Spawn the polling task for a flow already in `Pending`. Each tick issues
/// one fresh, independent lookup via `probe`; the task exits on `Success` or
/// cancellation.
pub fn spawn_poller<P>(interval: Duration, mut probe: P) -> Poller
where
    P: FnMut() -> BoxFuture<'static, Result<Entitlement>> + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let (phase_tx, phase_rx) = watch::channel(Phase::Pending);

    let task = tokio::spawn(async move {
        let mut flow = UpgradeFlow {
            phase: Phase::Pending,
        };
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    let observed = probe().await;
                    if let Err(ref e) = observed {
                        // Transient failure: retried on the next tick, never
                        // surfaced, never regresses.
                        tracing::debug!("entitlement poll failed, will retry: {}", e);
                    }
                    if flow.observe(observed) == Phase::Success {
                        let _ = phase_tx.send(Phase::Success);
                        break;
                    }
                }
            }
        }
    });

    Poller {
        shutdown: shutdown_tx,
        phase: phase_rx,
        task,
    }
}
