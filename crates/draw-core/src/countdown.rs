//! Countdown Clock - 1Hz remaining-time ticker for the active round
//!
//! While a round is active a single task ticks once per period, refreshes
//! `remaining_label` and flips `is_settling` when the sale window closes.
//! Restarting for a new round or stopping aborts the previous task, so no
//! tick from an old round can land after the switch.

use crate::clock::Clock;
use crate::round_state::{RoundStore, UpdateCause};
use crate::TICK_PERIOD;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Label shown once the sale window has closed
pub const EXPIRED_LABEL: &str = "0:00";

/// Result of evaluating one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Time remains, formatted as `M:SS`
    Remaining(String),
    /// The sale window is closed
    Expired,
}

/// Evaluate the countdown for a round ending at `end_time`
pub fn evaluate(end_time: u64, now: u64) -> Tick {
    match end_time.checked_sub(now) {
        Some(left) if left > 0 => Tick::Remaining(format_remaining(left)),
        _ => Tick::Expired,
    }
}

/// Format seconds as `M:SS` (minutes unpadded, seconds zero-padded)
pub fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

struct CountdownTask {
    round: u64,
    handle: JoinHandle<()>,
}

/// Periodic countdown bound to one round at a time
pub struct CountdownClock {
    store: RoundStore,
    clock: Arc<dyn Clock>,
    period: Duration,
    task: Mutex<Option<CountdownTask>>,
}

impl CountdownClock {
    /// A zero period falls back to [`TICK_PERIOD`]
    pub fn new(store: RoundStore, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let period = if period.is_zero() {
            tracing::warn!("Zero countdown period, ticking every {:?}", TICK_PERIOD);
            TICK_PERIOD
        } else {
            period
        };
        Self {
            store,
            clock,
            period,
            task: Mutex::new(None),
        }
    }

    /// Bring the ticker in line with the round's end time
    ///
    /// Starts a task for a newly active round, restarts it when the end time
    /// changed and stops it when no round is active. A task already running
    /// for `end_time` is left alone.
    pub fn sync(&self, end_time: u64) {
        if end_time == 0 {
            self.stop();
            return;
        }
        if self.running_round() == Some(end_time) {
            return;
        }
        self.start(end_time);
    }

    /// Round the ticker is currently counting down, if any
    pub fn running_round(&self) -> Option<u64> {
        self.task
            .lock()
            .as_ref()
            .filter(|task| !task.handle.is_finished())
            .map(|task| task.round)
    }

    fn start(&self, round: u64) {
        let store = self.store.clone();
        let clock = self.clock.clone();
        let period = self.period;
        let handle = tokio::spawn(run_countdown(store, clock, round, period));

        if let Some(previous) = self.task.lock().replace(CountdownTask { round, handle }) {
            previous.handle.abort();
            tracing::debug!("Countdown for round {} replaced by {}", previous.round, round);
        }
        tracing::debug!("Countdown started for round ending at {}", round);
    }

    /// Stop ticking; no tick fires after this returns
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.handle.abort();
            tracing::debug!("Countdown stopped for round {}", task.round);
        }
    }
}

impl Drop for CountdownClock {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_countdown(store: RoundStore, clock: Arc<dyn Clock>, round: u64, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut announced = false;

    loop {
        interval.tick().await;

        if store.read(|state| state.end_time) != round {
            tracing::debug!("Round {} no longer current, countdown exiting", round);
            return;
        }

        let now = clock.now_epoch_seconds();
        match evaluate(round, now) {
            Tick::Remaining(label) => {
                tracing::trace!("Round {}: {} left (now {})", round, label, now);
                store.update_if(UpdateCause::Tick, |state| {
                    if state.end_time != round || state.remaining_label == label {
                        return false;
                    }
                    state.remaining_label = label;
                    true
                });
            }
            Tick::Expired if !announced => {
                announced = true;
                let entered = store.update_if(UpdateCause::SettlingStarted { round }, |state| {
                    if state.end_time != round {
                        return false;
                    }
                    if state.is_settling && state.remaining_label == EXPIRED_LABEL {
                        return false;
                    }
                    state.remaining_label = EXPIRED_LABEL.to_string();
                    state.is_settling = true;
                    true
                });
                if entered.is_some() {
                    tracing::info!("Round {} sale window closed, draw is settling", round);
                }
            }
            Tick::Expired => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(120), "2:00");
        assert_eq!(format_remaining(65), "1:05");
        assert_eq!(format_remaining(59), "0:59");
        assert_eq!(format_remaining(1), "0:01");
        assert_eq!(format_remaining(3_600), "60:00");
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(1_100, 1_000), Tick::Remaining("1:40".into()));
        assert_eq!(evaluate(1_000, 1_000), Tick::Expired);
        assert_eq!(evaluate(1_000, 1_200), Tick::Expired);
        assert_eq!(evaluate(0, u64::MAX), Tick::Expired);
        assert!(matches!(evaluate(u64::MAX, 1_000), Tick::Remaining(_)));
        assert!(matches!(
            evaluate(i64::MAX as u64 + 10, 1_700_000_000),
            Tick::Remaining(_)
        ));
    }

    fn countdown_at(base: u64) -> (RoundStore, CountdownClock) {
        let store = RoundStore::new();
        let clock = Arc::new(TokioClock::starting_at(base));
        let countdown = CountdownClock::new(store.clone(), clock, Duration::from_secs(1));
        (store, countdown)
    }

    #[tokio::test(start_paused = true)]
    async fn test_label_counts_down() {
        let (store, countdown) = countdown_at(10_000);
        store.update(UpdateCause::Bootstrap, |state| state.end_time = 10_090);

        countdown.sync(10_090);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.snapshot().remaining_label, "1:30");

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.snapshot().remaining_label, "0:59");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_sets_settling_once() {
        let (store, countdown) = countdown_at(10_000);
        let mut rx = store.subscribe();
        store.update(UpdateCause::Bootstrap, |state| state.end_time = 10_003);

        countdown.sync(10_003);
        tokio::time::sleep(Duration::from_secs(10)).await;

        let state = store.snapshot();
        assert_eq!(state.remaining_label, EXPIRED_LABEL);
        assert!(state.is_settling);

        let mut settling_events = 0;
        while let Ok(update) = rx.try_recv() {
            if matches!(update.cause, UpdateCause::SettlingStarted { .. }) {
                settling_events += 1;
            }
        }
        assert_eq!(settling_events, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_far_end_time_is_not_settling() {
        let (store, countdown) = countdown_at(10_000);
        store.update(UpdateCause::Bootstrap, |state| state.end_time = u64::MAX);

        countdown.sync(u64::MAX);
        tokio::time::sleep(Duration::from_secs(3)).await;

        let state = store.snapshot();
        assert!(!state.is_settling);
        assert_ne!(state.remaining_label, EXPIRED_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_still_ticks() {
        let store = RoundStore::new();
        let clock = Arc::new(TokioClock::starting_at(10_000));
        let countdown = CountdownClock::new(store.clone(), clock, Duration::ZERO);
        store.update(UpdateCause::Bootstrap, |state| state.end_time = 10_005);

        countdown.sync(10_005);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.snapshot().remaining_label, "0:05");
        assert_eq!(countdown.running_round(), Some(10_005));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let state = store.snapshot();
        assert!(state.is_settling);
        assert_eq!(state.remaining_label, EXPIRED_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let (store, countdown) = countdown_at(10_000);
        store.update(UpdateCause::Bootstrap, |state| state.end_time = 10_100);
        countdown.sync(10_100);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(countdown.running_round(), Some(10_100));

        countdown.sync(0);
        assert_eq!(countdown.running_round(), None);

        let mut rx = store.subscribe();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(store.snapshot().remaining_label, "1:40");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_same_round_keeps_task() {
        let (store, countdown) = countdown_at(10_000);
        store.update(UpdateCause::Bootstrap, |state| state.end_time = 10_100);
        countdown.sync(10_100);
        countdown.sync(10_100);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(countdown.running_round(), Some(10_100));

        store.update(UpdateCause::Bootstrap, |state| state.end_time = 10_200);
        countdown.sync(10_200);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(countdown.running_round(), Some(10_200));
        assert_eq!(store.snapshot().remaining_label, "3:20");
    }
}
