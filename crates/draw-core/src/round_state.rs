//! Round State - the client's derived view of the current draw
//!
//! A single [`RoundState`] record lives in a [`RoundStore`]. Every mutation
//! is applied to the whole record under one write guard and then published
//! as a [`RoundUpdate`] snapshot, so subscribers never see a half-applied
//! change.

use draw_types::Address;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the update channel; slow subscribers skip to the latest state
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Derived in-memory state of the current round
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundState {
    /// A wallet/ledger session is established
    pub connected: bool,
    /// Signer account of the session
    pub account: Option<Address>,
    /// The signer is the contract admin
    pub is_admin: bool,
    /// UNIX time the sale window closes, 0 when no round is active
    pub end_time: u64,
    /// Remaining time as `M:SS`
    pub remaining_label: String,
    /// The round has ended and its winner is not confirmed yet
    pub is_settling: bool,
    /// Winner of the last settled round
    pub winner: Option<Address>,
    /// Tickets this client bought in the current round
    ///
    /// Advisory only: tickets bought by other clients never show up here.
    pub sold_tickets: BTreeSet<u8>,
    /// Last user-visible failure
    pub last_error: Option<String>,
}

impl RoundState {
    /// A round is running (first ticket sold, not yet reset)
    pub fn has_active_round(&self) -> bool {
        self.end_time > 0
    }

    pub fn is_sold(&self, ticket: u8) -> bool {
        self.sold_tickets.contains(&ticket)
    }

    /// Apply the settlement reset: new winner, no round, no tickets
    pub fn settle(&mut self, winner: Option<Address>) {
        self.winner = winner;
        self.is_settling = false;
        self.end_time = 0;
        self.remaining_label.clear();
        self.sold_tickets.clear();
    }
}

/// What caused a state update
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateCause {
    /// State cleared for a fresh sync
    Reset,
    /// Wallet session established
    Connected,
    /// Initial sync finished
    Bootstrap,
    /// Countdown tick refreshed the label
    Tick,
    /// Countdown reached zero
    SettlingStarted { round: u64 },
    /// A ticket purchase was confirmed and merged
    TicketPurchased { ticket: u8 },
    /// Settlement reconciled, round reset
    Settled { round: u64 },
    /// A failure was recorded in `last_error`
    Error,
}

/// Snapshot published after every mutation
#[derive(Clone, Debug)]
pub struct RoundUpdate {
    pub cause: UpdateCause,
    pub state: RoundState,
}

/// Shared single-record store for [`RoundState`]
#[derive(Clone)]
pub struct RoundStore {
    state: Arc<RwLock<RoundState>>,
    updates: broadcast::Sender<RoundUpdate>,
}

impl RoundStore {
    /// Create a store holding an empty (disconnected) state
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(RoundState::default())),
            updates,
        }
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> RoundState {
        self.state.read().clone()
    }

    /// Read a single value without cloning the record
    pub fn read<R>(&self, f: impl FnOnce(&RoundState) -> R) -> R {
        f(&self.state.read())
    }

    /// Subscribe to state updates
    pub fn subscribe(&self) -> broadcast::Receiver<RoundUpdate> {
        self.updates.subscribe()
    }

    /// Apply a mutation atomically and publish the result
    pub fn update(&self, cause: UpdateCause, f: impl FnOnce(&mut RoundState)) -> RoundState {
        self.update_if(cause, |state| {
            f(state);
            true
        })
        .unwrap_or_else(|| self.snapshot())
    }

    /// Apply a mutation that may decline to change anything
    ///
    /// The closure works on a copy; the copy replaces the record only when it
    /// returns `true`, and only then is an update published. Publishing
    /// happens under the write lock so updates arrive in commit order.
    pub fn update_if(
        &self,
        cause: UpdateCause,
        f: impl FnOnce(&mut RoundState) -> bool,
    ) -> Option<RoundState> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        if !f(&mut next) {
            return None;
        }
        *guard = next.clone();

        // No subscribers is fine
        let _ = self.updates.send(RoundUpdate {
            cause,
            state: next.clone(),
        });
        Some(next)
    }

    /// Record a user-visible failure without touching anything else
    pub fn record_error(&self, message: &str) {
        self.update(UpdateCause::Error, |state| {
            state.last_error = Some(message.to_string());
        });
    }
}

impl Default for RoundStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = RoundStore::new();
        let state = store.snapshot();
        assert!(!state.connected);
        assert!(!state.has_active_round());
        assert!(state.sold_tickets.is_empty());
        assert!(state.winner.is_none());
    }

    #[tokio::test]
    async fn test_update_publishes_whole_record() {
        let store = RoundStore::new();
        let mut rx = store.subscribe();

        store.update(UpdateCause::TicketPurchased { ticket: 4 }, |state| {
            state.end_time = 500;
            state.sold_tickets.insert(4);
        });

        let update = rx.recv().await.unwrap();
        assert_eq!(update.cause, UpdateCause::TicketPurchased { ticket: 4 });
        assert_eq!(update.state.end_time, 500);
        assert!(update.state.is_sold(4));
        assert_eq!(update.state, store.snapshot());
    }

    #[tokio::test]
    async fn test_declined_update_is_not_published() {
        let store = RoundStore::new();
        let mut rx = store.subscribe();

        let result = store.update_if(UpdateCause::Tick, |state| {
            state.end_time = 99;
            false
        });

        assert!(result.is_none());
        assert_eq!(store.snapshot().end_time, 0);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_settle_resets_round() {
        let mut state = RoundState {
            end_time: 1_000,
            is_settling: true,
            remaining_label: "0:00".into(),
            sold_tickets: [1, 2, 3].into_iter().collect(),
            ..Default::default()
        };
        let winner = Address::new_unchecked("0x00000000000000000000000000000000000000aa");

        state.settle(Some(winner.clone()));

        assert_eq!(state.winner, Some(winner));
        assert_eq!(state.end_time, 0);
        assert!(!state.is_settling);
        assert!(state.sold_tickets.is_empty());
    }

    #[test]
    fn test_record_error_keeps_round() {
        let store = RoundStore::new();
        store.update(UpdateCause::Bootstrap, |state| state.end_time = 42);
        store.record_error("boom");

        let state = store.snapshot();
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        assert_eq!(state.end_time, 42);
    }

    #[test]
    fn test_concurrent_updates_arrive_in_commit_order() {
        let store = RoundStore::new();
        let mut rx = store.subscribe();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        store.update(UpdateCause::Tick, |state| state.end_time += 1);
                    }
                });
            }
        });

        let mut last = 0;
        let mut received = 0;
        loop {
            match rx.try_recv() {
                Ok(update) => {
                    assert!(update.state.end_time > last);
                    last = update.state.end_time;
                    received += 1;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(received > 0);
        assert_eq!(last, 800);
        assert_eq!(store.snapshot().end_time, 800);
    }
}
