//! Lottery Session - bootstrap, timer supervision and teardown
//!
//! A session owns the round store and, once a wallet session exists, the
//! countdown, the settlement watcher and the purchase flow. A supervisor task
//! follows store updates and keeps the timers in step with the state:
//!
//! - `end_time` set or changed: (re)start the countdown
//! - `end_time` back to 0: stop the countdown
//! - `is_settling` raised: arm the watcher for that round
//! - round replaced while the watcher waits: cancel it

use crate::clock::Clock;
use crate::countdown::CountdownClock;
use crate::error::{DrawError, GatewayError, BOOTSTRAP_FAILED_MSG, PURCHASE_FAILED_MSG};
use crate::gateway::{ContractGateway, Wallet};
use crate::purchase::{InFlightTickets, TicketPurchaseFlow};
use crate::round_state::{RoundState, RoundStore, RoundUpdate, UpdateCause};
use crate::settlement::{SettlementWatcher, WatcherPhase, SETTLEMENT_DELAY};
use crate::view::ViewModel;
use crate::TICK_PERIOD;
use draw_types::TransactionReceipt;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Session timing configuration
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Countdown tick period
    pub tick_period: Duration,
    /// Wait between a round closing and the winner check
    pub settlement_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_period: TICK_PERIOD,
            settlement_delay: SETTLEMENT_DELAY,
        }
    }
}

/// Timers and flows bound to one established wallet session
struct Engine {
    countdown: Arc<CountdownClock>,
    watcher: SettlementWatcher,
    purchases: Arc<TicketPurchaseFlow>,
    supervisor: JoinHandle<()>,
}

impl Engine {
    fn start(
        store: &RoundStore,
        gateway: Arc<dyn ContractGateway>,
        clock: Arc<dyn Clock>,
        in_flight: InFlightTickets,
        config: &SessionConfig,
    ) -> Self {
        let countdown = Arc::new(CountdownClock::new(
            store.clone(),
            clock,
            config.tick_period,
        ));
        let watcher = SettlementWatcher::new(
            store.clone(),
            gateway.clone(),
            config.settlement_delay,
        );
        let purchases = Arc::new(
            TicketPurchaseFlow::new(store.clone(), gateway).with_in_flight(in_flight),
        );

        let supervisor = tokio::spawn(supervise(
            store.clone(),
            store.subscribe(),
            countdown.clone(),
            watcher.clone(),
        ));

        Self {
            countdown,
            watcher,
            purchases,
            supervisor,
        }
    }

    fn shutdown(&self) {
        self.supervisor.abort();
        self.countdown.stop();
        self.watcher.cancel();
    }
}

/// Client session against one lottery contract
pub struct LotterySession {
    store: RoundStore,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    /// Outlives engines so a reload cannot resubmit a pending ticket
    in_flight: InFlightTickets,
    engine: Mutex<Option<Engine>>,
}

impl LotterySession {
    /// Create a disconnected session
    pub fn new(clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self {
            store: RoundStore::new(),
            clock,
            config,
            in_flight: InFlightTickets::default(),
            engine: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &RoundStore {
        &self.store
    }

    pub fn snapshot(&self) -> RoundState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundUpdate> {
        self.store.subscribe()
    }

    /// Establish a wallet session and load the round from the contract
    ///
    /// Calling it again tears down the previous session first and starts
    /// over from an empty state. The four reads are all-or-nothing: if any
    /// fails only `last_error` is published.
    pub async fn bootstrap(&self, wallet: &dyn Wallet) -> Result<(), DrawError> {
        self.stop_engine();
        self.store.update(UpdateCause::Reset, |state| {
            *state = RoundState::default();
        });

        let Some(gateway) = wallet.establish_session().await else {
            tracing::info!("No wallet session, waiting for the user to connect");
            return Err(DrawError::SessionUnavailable);
        };

        self.store
            .update(UpdateCause::Connected, |state| state.connected = true);
        *self.engine.lock() = Some(Engine::start(
            &self.store,
            gateway.clone(),
            self.clock.clone(),
            self.in_flight.clone(),
            &self.config,
        ));

        let reads = tokio::try_join!(
            gateway.admin(),
            gateway.signer_address(),
            gateway.round_end_time(),
            gateway.winner()
        );

        match reads {
            Ok((admin, signer, end_time, winner)) => {
                let is_admin = admin == signer;
                let winner = Some(winner).filter(|w| !w.is_unset());
                tracing::info!(
                    "Synced with contract: signer {} (admin: {}), round end {}, last winner {}",
                    signer,
                    is_admin,
                    end_time,
                    winner
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "none".to_string())
                );
                self.store.update(UpdateCause::Bootstrap, |state| {
                    state.account = Some(signer);
                    state.is_admin = is_admin;
                    state.end_time = end_time;
                    state.winner = winner;
                    state.is_settling = false;
                    state.remaining_label.clear();
                    state.sold_tickets.clear();
                });
                Ok(())
            }
            Err(e) => {
                let err = DrawError::BootstrapReadFailure(e);
                tracing::error!("{}", err);
                self.store.record_error(BOOTSTRAP_FAILED_MSG);
                Err(err)
            }
        }
    }

    /// Buy a ticket through the active wallet session
    pub async fn purchase(&self, ticket: u8) -> Result<TransactionReceipt, DrawError> {
        let purchases = self
            .engine
            .lock()
            .as_ref()
            .map(|engine| engine.purchases.clone());

        match purchases {
            Some(purchases) => purchases.purchase(ticket).await,
            None => {
                let err = DrawError::PurchaseFailure {
                    ticket,
                    source: GatewayError::SessionUnavailable,
                };
                tracing::error!("{}", err);
                self.store.record_error(PURCHASE_FAILED_MSG);
                Err(err)
            }
        }
    }

    /// Tickets with a purchase in flight
    pub fn pending_tickets(&self) -> BTreeSet<u8> {
        self.in_flight.lock().clone()
    }

    /// Current view projection
    pub fn view(&self) -> ViewModel {
        ViewModel::project(&self.store.snapshot(), &self.pending_tickets())
    }

    /// Settlement watcher phase, `None` without a wallet session
    pub fn watcher_phase(&self) -> Option<WatcherPhase> {
        self.engine
            .lock()
            .as_ref()
            .map(|engine| engine.watcher.phase())
    }

    /// Settlement cycles started in this wallet session
    pub fn settlement_cycles(&self) -> u64 {
        self.engine
            .lock()
            .as_ref()
            .map_or(0, |engine| engine.watcher.cycles_started())
    }

    /// Round the countdown is ticking for
    pub fn countdown_round(&self) -> Option<u64> {
        self.engine
            .lock()
            .as_ref()
            .and_then(|engine| engine.countdown.running_round())
    }

    /// Cancel every timer; no tick or settlement check runs afterwards
    pub fn shutdown(&self) {
        if self.stop_engine() {
            tracing::info!("Lottery session shut down");
        }
    }

    fn stop_engine(&self) -> bool {
        match self.engine.lock().take() {
            Some(engine) => {
                engine.shutdown();
                true
            }
            None => false,
        }
    }
}

impl Drop for LotterySession {
    fn drop(&mut self) {
        self.stop_engine();
    }
}

async fn supervise(
    store: RoundStore,
    mut updates: broadcast::Receiver<RoundUpdate>,
    countdown: Arc<CountdownClock>,
    watcher: SettlementWatcher,
) {
    let align = |state: &RoundState| {
        countdown.sync(state.end_time);
        watcher.cancel_stale(state.end_time);
        if state.is_settling && state.has_active_round() {
            watcher.arm(state.end_time);
        }
    };

    align(&store.snapshot());
    loop {
        match updates.recv().await {
            Ok(_) => align(&store.snapshot()),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Supervisor lagged by {} updates, resyncing", skipped);
                align(&store.snapshot());
            }
            Err(RecvError::Closed) => break,
        }
    }
}
