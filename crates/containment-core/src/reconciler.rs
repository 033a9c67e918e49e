//! Reconciliation loop
//!
//! One invocation drives one intent from its recorded status toward
//! `applied` or `failed`:
//!
//! 1. Fetch; a missing intent is a no-op
//! 2. Skip terminal intents
//! 3. Gate on confidence, then approval
//! 4. Reject unrecognized actions
//! 5. Resolve the target from the alert id
//! 6. Dispatch and record the outcome
//!
//! Outcomes are recorded in the intent's status. Only cancellation,
//! conflicts and store failures are returned as errors; the host redelivers
//! those.

use crate::action::SuggestedAction;
use crate::cancel::Cancellation;
use crate::config::ReconcilerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ExecutorError, ReconcileError, StoreError};
use crate::executor::ActionExecutor;
use crate::policy::{DeferReason, GateDecision, GatingPolicy};
use crate::status::{Clock, StatusReporter, StatusUpdate};
use crate::store::IntentStore;
use crate::target::{DelimitedResolver, Target, TargetResolver};
use crate::types::{ContainmentIntent, IntentId};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Result recorded for an unrecognized suggested action
pub const UNKNOWN_ACTION: &str = "unknown_action";

/// Prefix of the result recorded for an unresolvable alert id
pub const UNRESOLVABLE_TARGET: &str = "unresolvable_target";

/// Scheduling request returned to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing further until the intent changes
    Done,
    /// Redeliver after the delay
    RequeueAfter(Duration),
}

/// What a reconcile decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Intent no longer exists
    Missing,
    /// Intent already terminal; nothing done
    Skipped,
    /// Gated; recorded pending with the reason
    Deferred(DeferReason),
    /// Action applied; carries the applied action name
    Applied(String),
    /// Terminal failure; carries the recorded result
    Failed(String),
    /// Retryable executor failure; carries the attempts recorded so far
    Retrying {
        /// Attempts recorded in status
        attempts: u32,
    },
}

/// Outcome plus scheduling request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Decision taken
    pub outcome: Outcome,
    /// Scheduling request
    pub action: ReconcileAction,
}

impl ReconcileReport {
    #[inline]
    fn done(outcome: Outcome) -> Self {
        Self {
            outcome,
            action: ReconcileAction::Done,
        }
    }

    /// Requested redelivery delay, if any
    #[inline]
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self.action {
            ReconcileAction::Done => None,
            ReconcileAction::RequeueAfter(delay) => Some(delay),
        }
    }
}

/// Drives intents to a terminal state
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn IntentStore>,
    dispatcher: Dispatcher,
    resolver: Arc<dyn TargetResolver>,
    reporter: StatusReporter,
    policy: GatingPolicy,
    config: ReconcilerConfig,
    span: tracing::Span,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create reconciler
    ///
    /// Targets are resolved with a [`DelimitedResolver`] over the configured
    /// default namespace; timestamps come from the system clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn IntentStore>,
        executor: Arc<dyn ActionExecutor>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            reporter: StatusReporter::new(Arc::clone(&store)),
            store,
            dispatcher: Dispatcher::new(executor),
            resolver: Arc::new(DelimitedResolver::new(config.default_namespace.clone())),
            policy: GatingPolicy::from_config(&config),
            config,
            span: tracing::Span::none(),
        }
    }

    /// With parent span for every reconcile
    #[inline]
    #[must_use]
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// With target resolver
    #[inline]
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// With clock for `lastUpdate`
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.reporter = self.reporter.with_clock(clock);
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reconcile one intent
    ///
    /// # Errors
    /// - `ReconcileError::Cancelled`/`DeadlineExceeded` if `cancel` fired mid-call
    /// - `ReconcileError::Conflict` if the intent changed before the status write
    /// - `ReconcileError::Store` on store failures
    /// - `ReconcileError::IllegalTransition` if the status was made terminal concurrently
    pub async fn reconcile(
        &self,
        id: &IntentId,
        cancel: &Cancellation,
    ) -> Result<ReconcileReport, ReconcileError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "reconcile",
            intent = %id,
            reconcile_id = %Uuid::new_v4(),
        );
        self.run(id, cancel).instrument(span).await
    }

    async fn run(
        &self,
        id: &IntentId,
        cancel: &Cancellation,
    ) -> Result<ReconcileReport, ReconcileError> {
        let Some(intent) = cancel.run(self.store.get(id)).await?? else {
            tracing::debug!("intent not found");
            return Ok(ReconcileReport::done(Outcome::Missing));
        };

        if intent.status.is_terminal() {
            tracing::debug!(state = ?intent.status.state, "intent already terminal");
            return Ok(ReconcileReport::done(Outcome::Skipped));
        }

        if let GateDecision::Defer {
            reason,
            requeue_after,
        } = self.policy.evaluate(&intent.spec)
        {
            return self.defer(&intent, reason, requeue_after, cancel).await;
        }

        let action = match intent.spec.suggested_action.resolve() {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!(%err, "rejecting intent");
                return self.fail(&intent, UNKNOWN_ACTION.to_owned(), cancel).await;
            }
        };

        let target = match self.resolver.resolve(&intent.spec.alert_id) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(alert_id = %intent.spec.alert_id, %err, "cannot resolve target");
                return self
                    .fail(&intent, format!("{UNRESOLVABLE_TARGET}: {err}"), cancel)
                    .await;
            }
        };

        self.apply(&intent, action, &target, cancel).await
    }

    /// Persist a status update; `false` when the intent was deleted since the fetch
    async fn record(
        &self,
        intent: &ContainmentIntent,
        update: StatusUpdate,
        cancel: &Cancellation,
    ) -> Result<bool, ReconcileError> {
        match self.reporter.persist(intent, update, cancel).await {
            Ok(_) => Ok(true),
            Err(ReconcileError::Store(StoreError::NotFound(_))) => {
                tracing::debug!("intent deleted before status write");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn defer(
        &self,
        intent: &ContainmentIntent,
        reason: DeferReason,
        requeue_after: Option<Duration>,
        cancel: &Cancellation,
    ) -> Result<ReconcileReport, ReconcileError> {
        tracing::warn!(
            %reason,
            confidence = %intent.spec.confidence,
            threshold = self.policy.confidence_threshold(),
            "containment deferred"
        );
        let update = StatusUpdate::pending(reason.as_str()).with_attempts(intent.status.attempts);
        if !self.record(intent, update, cancel).await? {
            return Ok(ReconcileReport::done(Outcome::Missing));
        }
        Ok(ReconcileReport {
            outcome: Outcome::Deferred(reason),
            action: requeue_after.map_or(ReconcileAction::Done, ReconcileAction::RequeueAfter),
        })
    }

    async fn fail(
        &self,
        intent: &ContainmentIntent,
        result: String,
        cancel: &Cancellation,
    ) -> Result<ReconcileReport, ReconcileError> {
        let update = StatusUpdate::failed(result.clone()).with_attempts(intent.status.attempts);
        if !self.record(intent, update, cancel).await? {
            return Ok(ReconcileReport::done(Outcome::Missing));
        }
        Ok(ReconcileReport::done(Outcome::Failed(result)))
    }

    async fn apply(
        &self,
        intent: &ContainmentIntent,
        action: SuggestedAction,
        target: &Target,
        cancel: &Cancellation,
    ) -> Result<ReconcileReport, ReconcileError> {
        let dispatched = cancel
            .run(self.dispatcher.dispatch(action, target, intent.spec.dry_run))
            .await?;

        match dispatched {
            Ok(applied) => {
                tracing::info!(
                    %action,
                    %target,
                    dry_run = intent.spec.dry_run,
                    applied = %applied,
                    "containment applied"
                );
                let update =
                    StatusUpdate::applied(applied.clone()).with_attempts(intent.status.attempts);
                if !self.record(intent, update, cancel).await? {
                    return Ok(ReconcileReport::done(Outcome::Missing));
                }
                Ok(ReconcileReport::done(Outcome::Applied(applied)))
            }
            Err(err) => self.executor_failed(intent, action, target, &err, cancel).await,
        }
    }

    async fn executor_failed(
        &self,
        intent: &ContainmentIntent,
        action: SuggestedAction,
        target: &Target,
        err: &ExecutorError,
        cancel: &Cancellation,
    ) -> Result<ReconcileReport, ReconcileError> {
        if !err.is_retryable() {
            tracing::warn!(%action, %target, %err, "containment failed");
            return self.fail(intent, format!("error: {err}"), cancel).await;
        }

        let attempts = intent.status.attempts.saturating_add(1);
        if attempts >= self.config.max_executor_attempts {
            tracing::warn!(%action, %target, %err, attempts, "containment failed after retries");
            let result = format!("error: {err}");
            let update = StatusUpdate::failed(result.clone()).with_attempts(attempts);
            if !self.record(intent, update, cancel).await? {
                return Ok(ReconcileReport::done(Outcome::Missing));
            }
            return Ok(ReconcileReport::done(Outcome::Failed(result)));
        }

        let backoff = self.config.retry_backoff();
        tracing::warn!(
            %action,
            %target,
            %err,
            attempts,
            backoff_secs = backoff.as_secs(),
            "containment will be retried"
        );
        if !self
            .record(intent, StatusUpdate::retrying(err, attempts), cancel)
            .await?
        {
            return Ok(ReconcileReport::done(Outcome::Missing));
        }
        Ok(ReconcileReport {
            outcome: Outcome::Retrying { attempts },
            action: ReconcileAction::RequeueAfter(backoff),
        })
    }
}
