//! Containment intent data model
//!
//! Defines the declarative record the reconcile loop consumes:
//! - Intent identity and store metadata
//! - The intent spec (alert, confidence, action, gating fields)
//! - The status sub-record the loop owns

use crate::action::ActionRequest;
use crate::error::{InvalidConfidence, ParseIntentIdError};
use chrono::{DateTime, Utc};
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, NumberValidation, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// API group/version of the intent document
pub const API_VERSION: &str = "containment.security.io/v1alpha1";

/// Kind of the intent document
pub const KIND: &str = "Containment";

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "default";

/// Intent identity: namespace and name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntentId {
    /// Namespace the intent lives in
    pub namespace: String,
    /// Intent name
    pub name: String,
}

impl IntentId {
    /// Create new intent id
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for IntentId {
    type Err = ParseIntentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            None if !s.is_empty() => Ok(Self::new(DEFAULT_NAMESPACE, s)),
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(ns, name))
            }
            _ => Err(ParseIntentIdError(s.to_owned())),
        }
    }
}

/// Certainty that the alert is a true positive, in `[0, 1]`
///
/// Out-of-range and non-finite values are rejected on construction and
/// during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Create a confidence score
    ///
    /// # Errors
    /// - `InvalidConfidence` if the value is not finite or outside `[0, 1]`
    pub fn new(value: f64) -> Result<Self, InvalidConfidence> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidConfidence(value))
        }
    }

    /// Raw score
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = InvalidConfidence;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl JsonSchema for Confidence {
    fn schema_name() -> String {
        "Confidence".to_owned()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::Number.into()),
            number: Some(Box::new(NumberValidation {
                minimum: Some(0.0),
                maximum: Some(1.0),
                ..NumberValidation::default()
            })),
            ..SchemaObject::default()
        }
        .into()
    }
}

/// Reconciliation state recorded in the status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntentState {
    /// Gated or waiting for a retry; the only non-terminal state
    Pending,
    /// Action applied (or simulated, in dry-run)
    Applied,
    /// Action rejected or failed
    Failed,
}

impl IntentState {
    /// Check if no further transition may occur
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Failed)
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-owned metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Intent name
    pub name: String,
    /// Namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Optimistic-concurrency counter, bumped on every write
    #[serde(default)]
    pub resource_version: u64,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_owned()
}

/// Desired containment, written by the alerting pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentSpec {
    /// Originating alert; resolves to the target workload
    #[serde(rename = "alertID")]
    pub alert_id: String,
    /// True-positive confidence
    pub confidence: Confidence,
    /// Suggested remediation
    pub suggested_action: ActionRequest,
    /// Simulate only
    #[serde(default)]
    pub dry_run: bool,
    /// Free-text rationale, passed through unchanged
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
    /// Human approval; presence is all that is checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_token: Option<String>,
}

impl ContainmentSpec {
    /// Check if a non-empty approval token is present
    #[inline]
    #[must_use]
    pub fn has_approval(&self) -> bool {
        self.approval_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// Observed outcome, written only by the reconcile loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentStatus {
    /// `None` until the first reconcile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IntentState>,
    /// Action name, suffixed `_dryrun` for simulations
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub applied_action: String,
    /// Outcome or reason code
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
    /// Time of the last status write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    /// Retryable executor failures so far
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl ContainmentStatus {
    /// Check if the intent reached a terminal state
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(IntentState::is_terminal)
    }
}

/// A containment intent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentIntent {
    /// Always [`API_VERSION`]
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Always [`KIND`]
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Identity and version
    pub metadata: ObjectMeta,
    /// Desired containment
    pub spec: ContainmentSpec,
    /// Observed outcome
    #[serde(default)]
    pub status: ContainmentStatus,
}

fn default_api_version() -> String {
    API_VERSION.to_owned()
}

fn default_kind() -> String {
    KIND.to_owned()
}

impl ContainmentIntent {
    /// Create a fresh intent with empty status
    #[must_use]
    pub fn new(id: &IntentId, spec: ContainmentSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: id.name.clone(),
                namespace: id.namespace.clone(),
                resource_version: 0,
            },
            spec,
            status: ContainmentStatus::default(),
        }
    }

    /// Intent identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> IntentId {
        IntentId::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Current resource version
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.metadata.resource_version
    }
}
