//! Testing utilities for the containment workspace
//!
//! Shared fixtures, executors, and store wrappers.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use containment_core::action::{ActionRequest, SuggestedAction};
use containment_core::error::{ExecutorError, ResolveError, StoreError};
use containment_core::executor::ActionExecutor;
use containment_core::status::Clock;
use containment_core::store::{InMemoryIntentStore, IntentStore};
use containment_core::target::{Target, TargetResolver};
use containment_core::types::{
    Confidence, ContainmentIntent, ContainmentSpec, ContainmentStatus, IntentId,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_NAMESPACE: &str = "sec";

/// Builder for intents; defaults describe an approved live eviction of `prod/svc-42`
#[derive(Debug, Clone)]
pub struct IntentBuilder {
    id: IntentId,
    spec: ContainmentSpec,
    status: ContainmentStatus,
}

impl IntentBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            id: IntentId::new(TEST_NAMESPACE, name),
            spec: ContainmentSpec {
                alert_id: "prod/svc-42".into(),
                confidence: Confidence::new(0.9).unwrap(),
                suggested_action: SuggestedAction::EvictWorkload.into(),
                dry_run: false,
                explanation: "suspicious outbound traffic".into(),
                approval_token: Some("tok-1".into()),
            },
            status: ContainmentStatus::default(),
        }
    }

    pub fn alert_id(mut self, alert_id: &str) -> Self {
        self.spec.alert_id = alert_id.into();
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.spec.confidence = Confidence::new(confidence).unwrap();
        self
    }

    pub fn action(mut self, action: SuggestedAction) -> Self {
        self.spec.suggested_action = action.into();
        self
    }

    pub fn raw_action(mut self, action: &str) -> Self {
        self.spec.suggested_action = ActionRequest::parse(action);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.spec.dry_run = dry_run;
        self
    }

    pub fn approval_token(mut self, token: Option<&str>) -> Self {
        self.spec.approval_token = token.map(str::to_owned);
        self
    }

    pub fn status(mut self, status: ContainmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> ContainmentIntent {
        let mut intent = ContainmentIntent::new(&self.id, self.spec);
        intent.status = self.status;
        intent
    }

    /// Insert into `store` and return the id
    pub fn insert_into(self, store: &InMemoryIntentStore) -> IntentId {
        store.insert(self.build())
    }
}

/// Executor call as observed by [`RecordingExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Isolate(Target),
    Evict(Target),
    Blackhole(Target),
}

/// Executor that records calls and replays scripted failures
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    scripted: Mutex<VecDeque<ExecutorError>>,
    always: Option<ExecutorError>,
    delay: Option<Duration>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `err`
    pub fn failing(err: ExecutorError) -> Self {
        Self {
            always: Some(err),
            ..Self::default()
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next call with `err`; later calls succeed
    pub fn fail_next(&self, err: ExecutorError) {
        self.scripted.lock().push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn record(&self, call: Call) -> Result<(), ExecutorError> {
        self.calls.lock().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.scripted.lock().pop_front();
        match scripted.or_else(|| self.always.clone()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn isolate(&self, target: &Target) -> Result<(), ExecutorError> {
        self.record(Call::Isolate(target.clone())).await
    }

    async fn evict(&self, target: &Target) -> Result<(), ExecutorError> {
        self.record(Call::Evict(target.clone())).await
    }

    async fn blackhole(&self, target: &Target) -> Result<(), ExecutorError> {
        self.record(Call::Blackhole(target.clone())).await
    }
}

/// Resolver backed by a fixed table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    targets: HashMap<String, Target>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, alert_id: &str, target: Target) -> Self {
        self.targets.insert(alert_id.to_owned(), target);
        self
    }
}

impl TargetResolver for StaticResolver {
    fn resolve(&self, alert_id: &str) -> Result<Target, ResolveError> {
        self.targets
            .get(alert_id)
            .cloned()
            .ok_or_else(|| ResolveError::InvalidWorkload(alert_id.to_owned()))
    }
}

/// Store whose first status write loses to a concurrent spec update
#[derive(Debug)]
pub struct ConflictOnceStore {
    inner: Arc<InMemoryIntentStore>,
    tripped: AtomicBool,
}

impl ConflictOnceStore {
    pub fn new(inner: Arc<InMemoryIntentStore>) -> Self {
        Self {
            inner,
            tripped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IntentStore for ConflictOnceStore {
    async fn get(&self, id: &IntentId) -> Result<Option<ContainmentIntent>, StoreError> {
        self.inner.get(id).await
    }

    async fn update_status(
        &self,
        id: &IntentId,
        expected_version: u64,
        status: ContainmentStatus,
    ) -> Result<u64, StoreError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            self.inner.update_spec(id, |_| {})?;
        }
        self.inner.update_status(id, expected_version, status).await
    }

    async fn list(&self) -> Result<Vec<IntentId>, StoreError> {
        self.inner.list().await
    }
}

/// Store where every intent disappears just before its status write
#[derive(Debug)]
pub struct VanishingStore {
    inner: Arc<InMemoryIntentStore>,
}

impl VanishingStore {
    pub fn new(inner: Arc<InMemoryIntentStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl IntentStore for VanishingStore {
    async fn get(&self, id: &IntentId) -> Result<Option<ContainmentIntent>, StoreError> {
        self.inner.get(id).await
    }

    async fn update_status(
        &self,
        id: &IntentId,
        expected_version: u64,
        status: ContainmentStatus,
    ) -> Result<u64, StoreError> {
        self.inner.remove(id);
        self.inner.update_status(id, expected_version, status).await
    }

    async fn list(&self) -> Result<Vec<IntentId>, StoreError> {
        self.inner.list().await
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(fixed_time())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}
