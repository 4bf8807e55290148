//! Minimum-interval throttling for outbound geocode requests.
//!
//! The provider's usage policy allows one request per second. The throttle
//! owns the timestamp of the last dispatch and makes the next caller wait
//! until the floor has elapsed, measured start-to-start.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

/// Source of time for the throttle.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually driven clock. `sleep` advances time instantly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += duration;
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Start-to-start request throttle.
pub struct Throttle {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    last_dispatch: tokio::sync::Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle with the given floor.
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            clock,
            last_dispatch: tokio::sync::Mutex::new(None),
        }
    }

    /// The enforced floor between dispatches.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// The clock this throttle measures with.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Wait for the next slot and claim it.
    ///
    /// Returns the instant recorded as the dispatch time. The lock is held
    /// across read, wait and update so two callers cannot claim the same
    /// slot.
    pub async fn acquire(&self) -> Instant {
        let mut last_dispatch = self.last_dispatch.lock().await;

        if let Some(last) = *last_dispatch {
            let since_last = self.clock.now().saturating_duration_since(last);
            if since_last < self.min_interval {
                let wait = self.min_interval - since_last;
                debug!(wait_ms = wait.as_millis() as u64, "throttling geocode request");
                self.clock.sleep(wait).await;
            }
        }

        let now = self.clock.now();
        *last_dispatch = Some(now);
        now
    }

    /// Time remaining before a request could be dispatched without waiting.
    pub async fn remaining(&self) -> Duration {
        match *self.last_dispatch.lock().await {
            Some(last) => self
                .min_interval
                .saturating_sub(self.clock.now().saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}
