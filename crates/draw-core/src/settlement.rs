//! Settlement Watcher - one-shot winner reconciliation after a round closes
//!
//! The contract's automation settles a round on its own schedule and the
//! client cannot subscribe to that. When the countdown reports the round as
//! settling the watcher waits a fixed grace period, reads the winner once and
//! resets the round:
//!
//! ```text
//! Idle --arm(round)--> Waiting --delay--> Reconciling --winner()--> Idle
//! ```
//!
//! Each round (keyed by its end time) gets at most one cycle.

use crate::error::{DrawError, WINNER_FETCH_FAILED_MSG};
use crate::gateway::ContractGateway;
use crate::round_state::{RoundStore, UpdateCause};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Grace period for the automation to settle a closed round
pub const SETTLEMENT_DELAY: Duration = Duration::from_secs(50);

/// Watcher phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPhase {
    Idle,
    /// Delay running for the round ending at `round`
    Waiting { round: u64 },
    /// Winner read in flight
    Reconciling { round: u64 },
}

struct WatcherState {
    phase: WatcherPhase,
    /// Last round a cycle was started for
    last_round: Option<u64>,
    handle: Option<JoinHandle<()>>,
    cycles: u64,
}

struct WatcherInner {
    store: RoundStore,
    gateway: Arc<dyn ContractGateway>,
    delay: Duration,
    state: Mutex<WatcherState>,
}

/// Delayed winner reconciliation, one cycle per round
#[derive(Clone)]
pub struct SettlementWatcher {
    inner: Arc<WatcherInner>,
}

impl SettlementWatcher {
    pub fn new(store: RoundStore, gateway: Arc<dyn ContractGateway>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                store,
                gateway,
                delay,
                state: Mutex::new(WatcherState {
                    phase: WatcherPhase::Idle,
                    last_round: None,
                    handle: None,
                    cycles: 0,
                }),
            }),
        }
    }

    pub fn phase(&self) -> WatcherPhase {
        self.inner.state.lock().phase
    }

    /// Number of cycles started over the watcher's lifetime
    pub fn cycles_started(&self) -> u64 {
        self.inner.state.lock().cycles
    }

    /// Start a cycle for `round` unless one was already started for it
    ///
    /// Returns `true` when a new cycle was scheduled. Arming for a different
    /// round cancels whatever was pending for the previous one.
    pub fn arm(&self, round: u64) -> bool {
        let mut state = self.inner.state.lock();
        if state.last_round == Some(round) {
            return false;
        }

        if let Some(previous) = state.handle.take() {
            previous.abort();
        }

        let inner = self.inner.clone();
        let delay = self.inner.delay;
        state.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.reconcile(round).await;
        }));
        state.phase = WatcherPhase::Waiting { round };
        state.last_round = Some(round);
        state.cycles += 1;

        tracing::info!(
            "Round {} settling, checking winner in {}s",
            round,
            delay.as_secs()
        );
        true
    }

    /// Cancel a pending cycle whose round is no longer the current one
    pub fn cancel_stale(&self, current_end_time: u64) {
        let mut state = self.inner.state.lock();
        if let WatcherPhase::Waiting { round } = state.phase {
            if round != current_end_time {
                if let Some(handle) = state.handle.take() {
                    handle.abort();
                }
                state.phase = WatcherPhase::Idle;
                tracing::warn!(
                    "Round changed from {} to {} while waiting, settlement check cancelled",
                    round,
                    current_end_time
                );
            }
        }
    }

    /// Abort any pending or in-flight cycle
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
        state.phase = WatcherPhase::Idle;
    }
}

impl WatcherInner {
    async fn reconcile(&self, round: u64) {
        {
            let mut state = self.state.lock();
            if state.phase != (WatcherPhase::Waiting { round }) {
                return;
            }
            if self.store.read(|s| s.end_time) != round {
                state.phase = WatcherPhase::Idle;
                tracing::warn!("Round {} replaced before settlement check, skipping", round);
                return;
            }
            state.phase = WatcherPhase::Reconciling { round };
        }

        tracing::debug!("Fetching winner for round {}", round);
        let result = self.gateway.winner().await;

        {
            let mut state = self.state.lock();
            if state.phase == (WatcherPhase::Reconciling { round }) {
                state.phase = WatcherPhase::Idle;
                state.handle = None;
            }
        }

        match result {
            Ok(winner) => {
                let winner = Some(winner).filter(|w| !w.is_unset());
                let applied = self.store.update_if(UpdateCause::Settled { round }, |state| {
                    if state.end_time != round {
                        return false;
                    }
                    state.settle(winner.clone());
                    true
                });
                match (applied, winner) {
                    (None, _) => tracing::warn!(
                        "Round {} replaced during settlement check, result dropped",
                        round
                    ),
                    (Some(_), Some(winner)) => {
                        tracing::info!("Round {} settled, winner {}", round, winner)
                    }
                    (Some(_), None) => tracing::info!("Round {} reset, no winner recorded", round),
                }
            }
            Err(e) => {
                let err = DrawError::WinnerFetchFailure(e);
                tracing::error!("Round {}: {}", round, err);
                // Unblock the view but leave the round itself as it was
                let applied = self.store.update_if(UpdateCause::Error, |state| {
                    if state.end_time != round {
                        return false;
                    }
                    state.last_error = Some(WINNER_FETCH_FAILED_MSG.to_string());
                    state.is_settling = false;
                    true
                });
                if applied.is_none() {
                    tracing::debug!("Round {} already replaced, failure not reported", round);
                }
            }
        }
    }
}
