//! Status reporting
//!
//! The reporter is the single status writer of a reconcile invocation. It
//! checks every write against the state machine, stamps `lastUpdate`, and
//! writes conditionally on the version the reconcile fetched.

use crate::cancel::Cancellation;
use crate::error::ReconcileError;
use crate::state_machine::validate_transition;
use crate::store::IntentStore;
use crate::types::{ContainmentIntent, ContainmentStatus, IntentState};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

/// Source of `lastUpdate` timestamps
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to whole seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

/// Status to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New state
    pub state: IntentState,
    /// Applied action name, set only on success
    pub applied_action: Option<String>,
    /// Outcome or reason code
    pub result: String,
    /// Retryable executor failures so far
    pub attempts: u32,
}

impl StatusUpdate {
    /// Pending with a reason code
    #[must_use]
    pub fn pending(reason: impl Into<String>) -> Self {
        Self {
            state: IntentState::Pending,
            applied_action: None,
            result: reason.into(),
            attempts: 0,
        }
    }

    /// Pending after a retryable executor failure
    #[must_use]
    pub fn retrying(message: impl std::fmt::Display, attempts: u32) -> Self {
        Self {
            state: IntentState::Pending,
            applied_action: None,
            result: format!("retrying: {message}"),
            attempts,
        }
    }

    /// Applied; the action name doubles as the result
    #[must_use]
    pub fn applied(action: impl Into<String>) -> Self {
        let action = action.into();
        Self {
            state: IntentState::Applied,
            applied_action: Some(action.clone()),
            result: action,
            attempts: 0,
        }
    }

    /// Failed with a result string
    #[must_use]
    pub fn failed(result: impl Into<String>) -> Self {
        Self {
            state: IntentState::Failed,
            applied_action: None,
            result: result.into(),
            attempts: 0,
        }
    }

    /// Carry an attempt count into the update
    #[inline]
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Persists reconcile outcomes
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn IntentStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter").finish_non_exhaustive()
    }
}

impl StatusReporter {
    /// Create reporter writing through `store`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn IntentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist `update` for the intent as fetched
    ///
    /// # Returns
    /// The status as written
    ///
    /// # Errors
    /// - `ReconcileError::IllegalTransition` if the write would leave a terminal state
    /// - `ReconcileError::Conflict` if the intent changed since it was fetched
    /// - `ReconcileError::Cancelled`/`DeadlineExceeded` if interrupted
    pub async fn persist(
        &self,
        intent: &ContainmentIntent,
        update: StatusUpdate,
        cancel: &Cancellation,
    ) -> Result<ContainmentStatus, ReconcileError> {
        validate_transition(intent.status.state, update.state)?;

        let status = ContainmentStatus {
            state: Some(update.state),
            applied_action: update
                .applied_action
                .unwrap_or_else(|| intent.status.applied_action.clone()),
            result: update.result,
            last_update: Some(self.clock.now()),
            attempts: update.attempts,
        };

        let id = intent.id();
        let version = cancel
            .run(
                self.store
                    .update_status(&id, intent.version(), status.clone()),
            )
            .await??;
        tracing::debug!(
            intent = %id,
            state = %update.state,
            result = %status.result,
            version,
            "status persisted"
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SuggestedAction;
    use crate::store::InMemoryIntentStore;
    use crate::types::{Confidence, ContainmentSpec, IntentId};
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn setup() -> (Arc<InMemoryIntentStore>, StatusReporter, IntentId, DateTime<Utc>) {
        let store = Arc::new(InMemoryIntentStore::new());
        let id = store.insert(ContainmentIntent::new(
            &IntentId::new("sec", "a"),
            ContainmentSpec {
                alert_id: "prod/svc-42".into(),
                confidence: Confidence::new(0.9).unwrap(),
                suggested_action: SuggestedAction::EvictWorkload.into(),
                dry_run: false,
                explanation: String::new(),
                approval_token: Some("tok-1".into()),
            },
        ));
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let reporter = StatusReporter::new(store.clone()).with_clock(Arc::new(FixedClock(at)));
        (store, reporter, id, at)
    }

    #[tokio::test]
    async fn applied_sets_action_result_and_timestamp() {
        let (store, reporter, id, at) = setup();
        let intent = store.snapshot(&id).unwrap();

        let written = reporter
            .persist(&intent, StatusUpdate::applied("evict_pod"), &Cancellation::none())
            .await
            .unwrap();

        assert_eq!(written.state, Some(IntentState::Applied));
        assert_eq!(written.applied_action, "evict_pod");
        assert_eq!(written.result, "evict_pod");
        assert_eq!(written.last_update, Some(at));
        assert_eq!(store.snapshot(&id).unwrap().status, written);
    }

    #[tokio::test]
    async fn terminal_state_is_never_rewritten() {
        let (store, reporter, id, _) = setup();
        let intent = store.snapshot(&id).unwrap();
        reporter
            .persist(&intent, StatusUpdate::failed("unknown_action"), &Cancellation::none())
            .await
            .unwrap();

        let intent = store.snapshot(&id).unwrap();
        let err = reporter
            .persist(&intent, StatusUpdate::pending("awaiting_approval"), &Cancellation::none())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::IllegalTransition(_)));
        assert_eq!(store.snapshot(&id).unwrap().status.result, "unknown_action");
    }

    #[tokio::test]
    async fn stale_intent_conflicts() {
        let (store, reporter, id, _) = setup();
        let stale = store.snapshot(&id).unwrap();
        store.update_spec(&id, |spec| spec.dry_run = true).unwrap();

        let err = reporter
            .persist(&stale, StatusUpdate::pending("awaiting_approval"), &Cancellation::none())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Conflict { .. }));
    }

    #[test]
    fn system_clock_has_whole_seconds() {
        assert_eq!(SystemClock.now().timestamp_subsec_nanos(), 0);
    }
}
