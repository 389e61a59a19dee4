//! Wall-clock sources for round timing

/// Source of the current UNIX time in seconds
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Clock anchored on the tokio timer
///
/// Reports `base + elapsed` where elapsed is measured with
/// `tokio::time::Instant`, so a paused runtime advances it together with
/// every interval and sleep. Used by the in-process ledger and by tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base_epoch: u64,
    started: tokio::time::Instant,
}

impl TokioClock {
    /// Start counting from the given UNIX time
    pub fn starting_at(base_epoch: u64) -> Self {
        Self {
            base_epoch,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.base_epoch + self.started.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::starting_at(1_000);
        assert_eq!(clock.now_epoch_seconds(), 1_000);

        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now_epoch_seconds(), 1_001);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(clock.now_epoch_seconds(), 1_060);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2023-01-01T00:00:00Z
        assert!(SystemClock.now_epoch_seconds() > 1_672_531_200);
    }
}
