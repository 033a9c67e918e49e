//! Intent change detection
//!
//! Polls the store and enqueues intents that appeared or whose spec
//! changed. Status-only writes (made by the reconciler itself) do not
//! trigger a reconcile; approval and retry rechecks come from requeues.

use crate::queue::WorkQueue;
use containment_core::error::StoreError;
use containment_core::store::IntentStore;
use containment_core::types::{ContainmentSpec, IntentId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Polling event source
pub struct Watcher {
    store: Arc<dyn IntentStore>,
    queue: WorkQueue<IntentId>,
    interval: Duration,
    seen: HashMap<IntentId, ContainmentSpec>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("interval", &self.interval)
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Create watcher feeding `queue`
    #[must_use]
    pub fn new(
        store: Arc<dyn IntentStore>,
        queue: WorkQueue<IntentId>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            interval,
            seen: HashMap::new(),
        }
    }

    /// Scan once
    ///
    /// # Returns
    /// Number of intents enqueued
    ///
    /// # Errors
    /// - `StoreError` if the store cannot be listed
    pub async fn poll_once(&mut self) -> Result<usize, StoreError> {
        let ids = self.store.list().await?;
        let mut present = HashMap::with_capacity(ids.len());
        let mut enqueued = 0;

        for id in ids {
            let intent = match self.store.get(&id).await {
                Ok(Some(intent)) => intent,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(intent = %id, %err, "skipping unreadable intent");
                    continue;
                }
            };

            if self.seen.get(&id) != Some(&intent.spec) {
                tracing::debug!(intent = %id, version = intent.version(), "intent changed");
                self.queue.add(id.clone());
                enqueued += 1;
            }
            present.insert(id, intent.spec);
        }

        for gone in self.seen.keys().filter(|id| !present.contains_key(*id)) {
            tracing::debug!(intent = %gone, "intent removed");
        }
        self.seen = present;
        Ok(enqueued)
    }

    /// Poll until `shutdown` observes `true`
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval = ?self.interval, "watcher started");

        loop {
            tokio::select! {
                // A dropped sender also stops the watcher
                _ = async { drop(shutdown.wait_for(|stop| *stop).await) } => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.poll_once().await {
                        tracing::warn!(%err, "intent scan failed");
                    }
                }
            }
        }
        tracing::info!("watcher stopped");
    }
}
