//! Signal transport between queue workers and the history recorder.
//!
//! ```text
//! Queue worker ──publish──▶ EventBus ──subscribe──▶ RecorderWorker ──▶ HistoryRecorder
//! ```
//!
//! Publishing is best-effort. A queue worker must never fail a job because
//! the monitor is not listening, so [`EventBus::emit`] logs and moves on.
//! Signals for one job arrive in the order its worker published them;
//! signals for different jobs may interleave freely.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use tracing::{trace, warn};

/// Outcome of waiting on a [`Subscription`].
#[derive(Debug, PartialEq)]
pub enum Delivery<M> {
    Signal(M),
    /// Nothing arrived within the wait.
    Idle,
    /// The bus is gone; no further signals will arrive.
    Closed,
}

/// Receiving end handed out by [`EventBus::subscribe`].
///
/// Sees every signal published after it was created. Owned by a single
/// consumer.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait up to `wait` for the next signal.
    pub fn next(&self, wait: Duration) -> Delivery<M> {
        match self.receiver.recv_timeout(wait) {
            Ok(message) => Delivery::Signal(message),
            Err(RecvTimeoutError::Timeout) => Delivery::Idle,
            Err(RecvTimeoutError::Disconnected) => Delivery::Closed,
        }
    }

    /// Take every signal already queued, without waiting.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Pub/sub transport for lifecycle signals.
pub trait EventBus<M>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Deliver `message` to every live subscription.
    ///
    /// Returns how many subscriptions received it.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    fn subscribe(&self) -> Subscription<M>;

    /// Publish without failing the caller.
    ///
    /// A transport error or a bus nobody listens to is a monitoring gap, not
    /// a job failure; both are logged and swallowed.
    fn emit(&self, message: M) {
        match self.publish(message) {
            Ok(0) => trace!("lifecycle signal published with no subscribers"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "lifecycle signal dropped"),
        }
    }
}
