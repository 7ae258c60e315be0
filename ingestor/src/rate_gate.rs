//! The adaptive pause controller shared by all crawl workers.
//!
//! A mutex-guarded `paused`/`pause_until`/`current_delay` triple, doubling
//! the delay (capped at `max_delay`) on every `pause()` and resetting it on
//! `reset()`. `tokio::sync::Notify` stands in for a close-and-replace
//! channel: `notify_waiters()` wakes everyone currently waiting, and a
//! fresh `notified()` future is how a caller "gets a new channel" for the
//! next pause.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

struct State {
    paused: bool,
    pause_until: Instant,
    current_delay: Duration,
}

/// Single adaptive pause signal shared by all workers in a crawl.
pub struct RateGate {
    state: Mutex<State>,
    base_delay: Duration,
    max_delay: Duration,
    notify: Notify,
}

impl RateGate {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        RateGate {
            state: Mutex::new(State { paused: false, pause_until: Instant::now(), current_delay: base_delay }),
            base_delay,
            max_delay,
            notify: Notify::new(),
        }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Current backoff, for observability/tests. `∈ [base_delay, max_delay]`.
    pub fn current_delay(&self) -> Duration {
        self.state.lock().current_delay
    }

    /// If paused and the deadline is in the future, returns `(true, remaining)`.
    /// If the deadline has passed, atomically clears `paused` and returns `(false, 0)`.
    pub fn should_pause(&self) -> (bool, Duration) {
        let mut state = self.state.lock();
        if !state.paused {
            return (false, Duration::ZERO);
        }

        let now = Instant::now();
        if now < state.pause_until {
            return (true, state.pause_until - now);
        }

        state.paused = false;
        (false, Duration::ZERO)
    }

    /// Enter (or extend) a pause: doubles `current_delay` (capped at
    /// `max_delay`) and wakes anyone blocked in [`wait_if_paused`] so they
    /// can observe the new, longer deadline.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        state.paused = true;
        state.pause_until = Instant::now() + state.current_delay;
        state.current_delay = (state.current_delay * 2).min(self.max_delay);
        drop(state);
        self.notify.notify_waiters();
    }

    /// Clear any pause and restore `current_delay` to `base_delay`.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        state.current_delay = self.base_delay;
    }

    /// Block the caller until no pause is in effect, waking early if a
    /// concurrent `pause()` extends the deadline. Returns
    /// [`CrawlError::ExceededMaxDelay`] if the remaining wait would meet or
    /// exceed `max_delay` (a worker should give up rather than wait that long).
    pub async fn wait_if_paused(&self) -> Result<(), crate::error::CrawlError> {
        loop {
            let (paused, remaining) = self.should_pause();
            if !paused {
                return Ok(());
            }
            if remaining >= self.max_delay {
                return Err(crate::error::CrawlError::ExceededMaxDelay);
            }

            tokio::select! {
                _ = tokio::time::sleep(remaining) => continue,
                _ = self.notify.notified() => continue,
            }
        }
    }
}

pub type SharedRateGate = Arc<RateGate>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Table-driven check: for any number of `pause()` calls without an
    /// intervening `reset()`, `current_delay` is monotonically
    /// non-decreasing and never exceeds `max_delay`.
    #[rstest]
    #[case(0, 100)]
    #[case(1, 200)]
    #[case(2, 400)]
    #[case(5, 500)] // caps at max_delay well before the 5th doubling
    #[case(10, 500)]
    fn pause_n_times_is_bounded_and_monotonic(#[case] pauses: usize, #[case] expected_ms: u64) {
        let gate = RateGate::new(Duration::from_millis(100), Duration::from_millis(500));
        let mut previous = gate.current_delay();
        for _ in 0..pauses {
            gate.pause();
            let current = gate.current_delay();
            assert!(current >= previous, "current_delay must not decrease across pauses");
            assert!(current <= Duration::from_millis(500), "current_delay must stay within max_delay");
            previous = current;
        }
        assert_eq!(gate.current_delay(), Duration::from_millis(expected_ms));
    }

    #[test]
    fn pause_doubles_delay_capped_at_max() {
        let gate = RateGate::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(gate.current_delay(), Duration::from_millis(100));

        gate.pause();
        assert_eq!(gate.current_delay(), Duration::from_millis(200));

        gate.pause();
        assert_eq!(gate.current_delay(), Duration::from_millis(350)); // capped, not 400

        gate.pause();
        assert_eq!(gate.current_delay(), Duration::from_millis(350)); // stays capped
    }

    #[test]
    fn reset_restores_base_delay() {
        let gate = RateGate::new(Duration::from_millis(100), Duration::from_secs(10));
        gate.pause();
        gate.pause();
        assert_ne!(gate.current_delay(), Duration::from_millis(100));

        gate.reset();
        assert_eq!(gate.current_delay(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn should_pause_clears_after_deadline() {
        let gate = RateGate::new(Duration::from_millis(50), Duration::from_secs(10));
        gate.pause();

        let (paused, _) = gate.should_pause();
        assert!(paused);

        tokio::time::advance(Duration::from_millis(60)).await;

        let (paused, remaining) = gate.should_pause();
        assert!(!paused);
        assert_eq!(remaining, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_if_paused_fails_when_remaining_meets_max_delay() {
        let gate = RateGate::new(Duration::from_secs(10), Duration::from_secs(10));
        gate.pause();

        let result = gate.wait_if_paused().await;
        assert!(matches!(result, Err(crate::error::CrawlError::ExceededMaxDelay)));
    }

    #[tokio::test]
    async fn wait_if_paused_returns_once_reset() {
        let gate = Arc::new(RateGate::new(Duration::from_millis(50), Duration::from_secs(10)));
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_if_paused().await })
        };

        tokio::task::yield_now().await;
        gate.reset();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(result.is_ok(), "wait_if_paused should resolve promptly after reset");
    }
}
