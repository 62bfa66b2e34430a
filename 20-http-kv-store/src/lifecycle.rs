//! Shutdown coordination shared by the reporter and the HTTP server.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Single-fire broadcast stop notice.
///
/// Starts open and closes at most once. Any number of tasks can wait on
/// [`StopSignal::closed`] at the same time, and all of them wake when it closes.
/// Clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the signal. Closing an already closed signal does nothing.
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is closed, immediately if it already is.
    pub async fn closed(&self) {
        self.token.cancelled().await;
    }
}

/// Phase of the server lifecycle. `Draining` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Draining,
}

/// How the bounded drain of the HTTP listener ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight connection finished before the timeout.
    Drained,
    /// The timeout elapsed and the remaining connections were dropped.
    Abandoned,
}

/// One-way `Running -> Draining` state machine owning the stop signal.
///
/// Cloning yields another handle to the same lifecycle, so the shutdown
/// trigger and the server can each hold one.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    draining: Arc<AtomicBool>,
    stop: StopSignal,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the lifecycle to `Draining` and closes the stop signal.
    ///
    /// Returns `true` only for the call that performed the transition. Every
    /// later or concurrent call returns `false` and has no effect.
    pub fn trigger(&self) -> bool {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("shutdown already triggered");
            return false;
        }

        info!("shutting down server");
        self.stop.close();
        true
    }

    pub fn phase(&self) -> Phase {
        if self.draining.load(Ordering::Acquire) {
            Phase::Draining
        } else {
            Phase::Running
        }
    }

    /// Handle for tasks that only need to observe the stop signal.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Resolves once the lifecycle has entered `Draining`.
    pub async fn draining(&self) {
        self.stop.closed().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn lifecycle_starts_running() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Running);
        assert!(!lifecycle.stop_signal().is_closed());
    }

    #[test]
    fn trigger_closes_signal_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.trigger());
        assert!(!lifecycle.trigger());
        assert_eq!(lifecycle.phase(), Phase::Draining);
        assert!(lifecycle.stop_signal().is_closed());
    }

    #[test]
    fn concurrent_triggers_have_a_single_winner() {
        let lifecycle = &Lifecycle::new();
        let winners = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(move || lifecycle.trigger()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("trigger thread panicked"))
                .filter(|won| *won)
                .count()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn closing_twice_is_harmless() {
        let signal = StopSignal::new();
        signal.close();
        signal.close();
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn every_waiter_observes_close() {
        let signal = StopSignal::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.closed().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.close();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake")
                .expect("waiter task panicked");
        }
    }

    #[tokio::test]
    async fn draining_resolves_after_trigger() {
        let lifecycle = Lifecycle::new();
        let observer = lifecycle.clone();
        let wait = tokio::spawn(async move { observer.draining().await });

        lifecycle.trigger();
        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("draining should resolve")
            .expect("draining task panicked");
    }
}
