//! Deadline and cancellation for collaborator calls
//!
//! Every store, reporter and executor call a reconcile awaits is wrapped in
//! [`Cancellation::run`]. When the deadline elapses or the signal fires, the
//! in-flight future is dropped and the call reports [`Interrupted`].

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a guarded call was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// Cancellation signal fired
    Cancelled,
    /// Deadline elapsed
    DeadlineExceeded,
}

/// Caller-supplied deadline and cancellation signal
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    deadline: Option<Instant>,
    signal: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// No deadline, never cancelled
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Abandon calls still running at `deadline`
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abandon calls still running `timeout` from now
    #[inline]
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Abandon calls once the receiver observes `true`
    #[inline]
    #[must_use]
    pub fn with_signal(mut self, signal: watch::Receiver<bool>) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Check whether calls would be abandoned right now
    #[must_use]
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.signal.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|at| Instant::now() >= at) {
            return Some(Interrupted::DeadlineExceeded);
        }
        None
    }

    /// Run `fut` unless cancelled or past the deadline
    ///
    /// # Errors
    /// - `Interrupted::Cancelled` if the signal fired first
    /// - `Interrupted::DeadlineExceeded` if the deadline elapsed first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        if let Some(reason) = self.interrupted() {
            return Err(reason);
        }

        let mut signal = self.signal.clone();
        let cancelled = async move {
            match signal.as_mut() {
                // A dropped sender can never cancel.
                Some(rx) => {
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Err(Interrupted::Cancelled),
            () = expired => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
