//! The reconnection tracker: clients that dropped and may come back.
//!
//! When a connection drops, its client is not evicted right away. The
//! tracker records a [`PendingDisconnect`] and the caller schedules a timer
//! task for the grace period. Two things can happen next:
//!
//! ```text
//!                      ┌── connect(same client_id) ──→ cancel()  → timer aborted
//! disconnect ─→ begin()┤
//!                      └── timer fires ──→ take_expired() → caller evicts
//! ```
//!
//! Each pending entry carries an epoch. A timer only evicts if the entry it
//! was armed for is still the current one, so a late-firing timer from an
//! earlier disconnect can never evict a client that has since reconnected
//! and dropped again.

use std::collections::HashMap;
use std::time::Duration;

use plaza_protocol::{ClientId, RoomId};
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// A client inside its grace period.
#[derive(Debug)]
pub struct PendingDisconnect {
    pub client_id: ClientId,
    /// The room the client was in when it dropped.
    pub room_id: RoomId,
    /// When the grace period ends.
    pub deadline: Instant,
    epoch: u64,
    timer: Option<AbortHandle>,
}

/// What a caller needs to arm the expiry timer for a new grace period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceTicket {
    pub client_id: ClientId,
    pub epoch: u64,
    pub deadline: Instant,
}

/// At most one [`PendingDisconnect`] per client.
#[derive(Debug, Default)]
pub struct ReconnectionTracker {
    pending: HashMap<ClientId, PendingDisconnect>,
    next_epoch: u64,
}

impl ReconnectionTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a grace period for `client_id`, ending `grace` from now.
    ///
    /// An existing entry for the same client is replaced and its timer
    /// aborted.
    pub fn begin(
        &mut self,
        client_id: ClientId,
        room_id: RoomId,
        grace: Duration,
    ) -> GraceTicket {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let deadline = Instant::now() + grace;

        let entry = PendingDisconnect {
            client_id: client_id.clone(),
            room_id,
            deadline,
            epoch,
            timer: None,
        };
        if let Some(stale) = self.pending.insert(client_id.clone(), entry) {
            tracing::debug!(
                %client_id,
                stale_epoch = stale.epoch,
                "grace period restarted"
            );
            abort_timer(stale);
        }
        tracing::debug!(%client_id, epoch, "grace period begun");

        GraceTicket {
            client_id,
            epoch,
            deadline,
        }
    }

    /// Attaches the timer task for a grace period, so [`cancel`] can abort it.
    ///
    /// Ignored if the grace period has already ended or been replaced; the
    /// timer is then aborted right away.
    ///
    /// [`cancel`]: Self::cancel
    pub fn arm(&mut self, ticket: &GraceTicket, timer: AbortHandle) {
        match self.pending.get_mut(&ticket.client_id) {
            Some(entry) if entry.epoch == ticket.epoch => {
                entry.timer = Some(timer);
            }
            _ => timer.abort(),
        }
    }

    /// Ends a client's grace period early because it reconnected.
    ///
    /// Idempotent: returns `None` if nothing was pending.
    pub fn cancel(&mut self, client_id: &ClientId) -> Option<PendingDisconnect> {
        let mut entry = self.pending.remove(client_id)?;
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        tracing::debug!(%client_id, epoch = entry.epoch, "grace period cancelled");
        Some(entry)
    }

    /// Claims an expired grace period for eviction.
    ///
    /// Returns the entry only if it is still the one `ticket` was issued for.
    /// Called from the timer task itself, so the timer is not aborted.
    pub fn take_expired(
        &mut self,
        ticket: &GraceTicket,
    ) -> Option<PendingDisconnect> {
        match self.pending.get(&ticket.client_id) {
            Some(entry) if entry.epoch == ticket.epoch => {
                self.pending.remove(&ticket.client_id)
            }
            _ => {
                tracing::trace!(
                    client_id = %ticket.client_id,
                    epoch = ticket.epoch,
                    "stale expiry ignored"
                );
                None
            }
        }
    }

    /// Returns `true` if the client is inside a grace period.
    pub fn is_pending(&self, client_id: &ClientId) -> bool {
        self.pending.contains_key(client_id)
    }

    /// Number of clients currently in grace.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nobody is in grace.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn abort_timer(mut entry: PendingDisconnect) {
    if let Some(timer) = entry.timer.take() {
        timer.abort();
    }
}
