//! Reconcile worker pool
//!
//! Workers pull intent ids from the [`WorkQueue`], reconcile them under a
//! per-reconcile deadline and the shared shutdown signal, and feed the
//! scheduling decision back into the queue.

use crate::queue::{Backoff, WorkQueue};
use crate::settings::ControllerSettings;
use containment_core::cancel::Cancellation;
use containment_core::error::ReconcileError;
use containment_core::reconciler::{ReconcileReport, Reconciler};
use containment_core::types::IntentId;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Outcome of one `--once` pass over an intent
#[derive(Debug)]
pub struct OnceResult {
    /// Intent reconciled
    pub id: IntentId,
    /// Final report or the error that ended the attempts
    pub result: Result<ReconcileReport, ReconcileError>,
}

/// Drives reconciles for queued intents
#[derive(Debug)]
pub struct Controller {
    reconciler: Reconciler,
    queue: WorkQueue<IntentId>,
    settings: ControllerSettings,
    cancel_tx: watch::Sender<bool>,
}

impl Controller {
    /// Create controller
    #[must_use]
    pub fn new(reconciler: Reconciler, settings: ControllerSettings) -> Self {
        let queue = WorkQueue::new(Backoff::new(settings.backoff_base(), settings.backoff_max()));
        let (cancel_tx, _) = watch::channel(false);
        Self {
            reconciler,
            queue,
            settings,
            cancel_tx,
        }
    }

    /// Queue handle for event sources
    #[inline]
    #[must_use]
    pub fn queue(&self) -> WorkQueue<IntentId> {
        self.queue.clone()
    }

    fn deadline(&self) -> Cancellation {
        Cancellation::none()
            .with_timeout(self.settings.reconcile_timeout())
            .with_signal(self.cancel_tx.subscribe())
    }

    /// Run workers until `shutdown` resolves
    ///
    /// On shutdown the queue stops handing out work and in-flight reconciles
    /// get one reconcile timeout to finish before they are cancelled.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let workers = self.settings.workers;
        tracing::info!(workers, "controller started");

        let pool = futures::future::join_all((0..workers).map(|worker| self.worker(worker)));
        tokio::pin!(pool);

        tokio::select! {
            _ = &mut pool => {
                tracing::info!("workers exited");
                return;
            }
            () = shutdown => {}
        }

        tracing::info!(in_flight = self.queue.in_flight(), "draining in-flight reconciles");
        self.queue.shutdown();
        let grace = self.settings.reconcile_timeout();
        if tokio::time::timeout(grace, &mut pool).await.is_err() {
            tracing::warn!(grace_secs = grace.as_secs(), "drain timed out; cancelling reconciles");
            self.cancel_tx.send_replace(true);
            pool.await;
        }
        tracing::info!("controller stopped");
    }

    async fn worker(&self, worker: usize) {
        while let Some(id) = self.queue.get().await {
            self.process(&id).await;
            self.queue.done(&id);
        }
        tracing::debug!(worker, "worker exited");
    }

    async fn process(&self, id: &IntentId) {
        match self.reconciler.reconcile(id, &self.deadline()).await {
            Ok(report) => {
                self.queue.forget(id);
                tracing::debug!(intent = %id, outcome = ?report.outcome, "reconciled");
                if let Some(delay) = report.requeue_after() {
                    self.queue.add_after(id.clone(), delay);
                }
            }
            Err(err) if err.is_retryable() => {
                if self.queue.is_shutting_down() && err.is_cancellation() {
                    tracing::info!(intent = %id, %err, "reconcile abandoned at shutdown");
                    return;
                }
                let delay = self.queue.add_rate_limited(id.clone());
                tracing::warn!(
                    intent = %id,
                    %err,
                    retry_in = ?delay,
                    "reconcile will be retried"
                );
            }
            Err(err) => {
                self.queue.forget(id);
                tracing::error!(intent = %id, %err, "reconcile failed");
            }
        }
    }

    /// Reconcile each id once, retrying redeliverable errors up to
    /// `max_attempts` times with the queue's backoff
    ///
    /// Requeue requests are reported, not honoured.
    pub async fn run_once(&self, ids: Vec<IntentId>, max_attempts: u32) -> Vec<OnceResult> {
        let backoff = Backoff::new(self.settings.backoff_base(), self.settings.backoff_max());
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let mut attempt = 1;
            let result = loop {
                match self.reconciler.reconcile(&id, &self.deadline()).await {
                    Err(err) if err.is_retryable() && attempt < max_attempts => {
                        tracing::warn!(intent = %id, %err, attempt, "retrying reconcile");
                        let delay = backoff.delay(attempt).min(Duration::from_secs(5));
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    other => break other,
                }
            };
            results.push(OnceResult { id, result });
        }
        results
    }
}
