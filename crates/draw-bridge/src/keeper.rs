//! Keeper - automation that settles ended rounds
//!
//! Polls the contract on a fixed interval and performs upkeep whenever a
//! round has ended. The client never talks to the keeper; it only sees the
//! effect through `winner()` and `lottery_end_time()`.

use crate::contract::SimulatedContract;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default upkeep check interval
pub const KEEPER_INTERVAL: Duration = Duration::from_secs(10);

/// Upkeep automation for a [`SimulatedContract`]
pub struct Keeper {
    contract: Arc<SimulatedContract>,
    interval: Duration,
}

impl Keeper {
    pub fn new(contract: Arc<SimulatedContract>) -> Self {
        Self {
            contract,
            interval: KEEPER_INTERVAL,
        }
    }

    /// Set the upkeep check interval; zero keeps the default
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            tracing::warn!("Zero keeper interval ignored, using {:?}", KEEPER_INTERVAL);
            return self;
        }
        self.interval = interval;
        self
    }

    /// Run the keeper on the current runtime
    pub fn spawn(self) -> KeeperHandle {
        let draws = Arc::new(AtomicU64::new(0));
        let counter = draws.clone();
        let handle = tokio::spawn(async move { self.run(counter).await });
        KeeperHandle { handle, draws }
    }

    async fn run(self, draws: Arc<AtomicU64>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Keeper started ({}s upkeep checks)", self.interval.as_secs());

        loop {
            interval.tick().await;
            if !self.contract.upkeep_needed() {
                continue;
            }
            if self.contract.perform_upkeep().is_some() {
                draws.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

/// Running keeper; stops when dropped
pub struct KeeperHandle {
    handle: JoinHandle<()>,
    draws: Arc<AtomicU64>,
}

impl KeeperHandle {
    /// Rounds this keeper has drawn
    pub fn draws(&self) -> u64 {
        self.draws.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for KeeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
