//! Suggested containment actions
//!
//! The action set is closed. A value outside it is captured at the
//! deserialization boundary as [`ActionRequest::Unrecognized`] so the
//! reconcile loop can record it, and it never reaches the dispatcher.

use crate::error::UnknownAction;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Suffix appended to the applied action name in dry-run mode
pub const DRY_RUN_SUFFIX: &str = "_dryrun";

/// Remediation the upstream alerting pipeline suggests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SuggestedAction {
    /// Deny all ingress and egress traffic for the workload
    IsolateNetwork,
    /// Gracefully terminate the running workload
    EvictWorkload,
    /// Drop traffic through the service mesh
    BlackholeTraffic,
}

impl SuggestedAction {
    /// Every action, in dispatch order
    pub const ALL: [Self; 3] = [
        Self::IsolateNetwork,
        Self::EvictWorkload,
        Self::BlackholeTraffic,
    ];

    /// Wire identifier, also the applied action name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IsolateNetwork => "isolate_pod",
            Self::EvictWorkload => "evict_pod",
            Self::BlackholeTraffic => "blackhole_traffic",
        }
    }

    /// Name recorded in `status.appliedAction`
    #[inline]
    #[must_use]
    pub fn applied_name(self, dry_run: bool) -> String {
        if dry_run {
            format!("{}{DRY_RUN_SUFFIX}", self.as_str())
        } else {
            self.as_str().to_owned()
        }
    }
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestedAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isolate_pod" | "IsolateNetwork" => Ok(Self::IsolateNetwork),
            "evict_pod" | "EvictWorkload" => Ok(Self::EvictWorkload),
            "blackhole_traffic" | "BlackholeTraffic" => Ok(Self::BlackholeTraffic),
            other => Err(UnknownAction(other.to_owned())),
        }
    }
}

/// Action field of an intent as it arrived on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionRequest {
    /// Member of the closed set
    Known(SuggestedAction),
    /// Anything else, kept verbatim for the status record
    Unrecognized(String),
}

impl ActionRequest {
    /// Classify a raw action string
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.parse::<SuggestedAction>()
            .map_or_else(|_| Self::Unrecognized(raw.to_owned()), Self::Known)
    }

    /// Resolve to a dispatchable action
    ///
    /// # Errors
    /// - `UnknownAction` if the value is outside the closed set
    pub fn resolve(&self) -> Result<SuggestedAction, UnknownAction> {
        match self {
            Self::Known(action) => Ok(*action),
            Self::Unrecognized(raw) => Err(UnknownAction(raw.clone())),
        }
    }

    /// Raw wire value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(action) => action.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<SuggestedAction> for ActionRequest {
    fn from(value: SuggestedAction) -> Self {
        Self::Known(value)
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl JsonSchema for ActionRequest {
    fn schema_name() -> String {
        "SuggestedAction".to_owned()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            enum_values: Some(
                SuggestedAction::ALL
                    .iter()
                    .map(|action| serde_json::Value::from(action.as_str()))
                    .collect(),
            ),
            ..SchemaObject::default()
        }
        .into()
    }
}
