//! Trailing-edge debounce for `select!` loops
//!
//! [`Debouncer::schedule`] stores a value and (re)starts the quiet period.
//! [`Debouncer::fired`] resolves with the latest value once the period passes
//! without another schedule. It is cancel-safe: dropping the future inside a
//! `select!` keeps the pending value and its deadline.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn schedule(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.delay, value));
    }

    /// Drop the pending value, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the quiet period to elapse. Never resolves while idle.
    pub async fn fired(&mut self) -> T {
        let deadline = match &self.pending {
            Some((deadline, _)) => *deadline,
            None => return std::future::pending().await,
        };
        tokio::time::sleep_until(deadline).await;
        match self.pending.take() {
            Some((_, value)) => value,
            None => std::future::pending().await,
        }
    }
}
