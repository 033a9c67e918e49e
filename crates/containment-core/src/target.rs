//! Alert-to-target resolution
//!
//! Alert ids are delimited strings: `<namespace>/<workload>`, or a bare
//! `<workload>` that lands in the configured default namespace. Both parts
//! must be DNS-1123 labels.

use crate::error::ResolveError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_LABEL_LEN: usize = 63;

static DNS_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS-1123 label pattern is valid")
});

/// Check if `value` is a DNS-1123 label
#[must_use]
pub fn is_dns_label(value: &str) -> bool {
    value.len() <= MAX_LABEL_LEN && DNS_LABEL.is_match(value)
}

/// Workload a containment action applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    /// Namespace of the workload
    pub namespace: String,
    /// Workload identity (pod name, matched by the `app` label)
    pub workload: String,
}

impl Target {
    /// Create new target
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, workload: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            workload: workload.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.workload)
    }
}

/// Maps an alert id to a target
///
/// Implementations must be pure: same input, same output, no I/O.
pub trait TargetResolver: Send + Sync {
    /// Resolve an alert id
    ///
    /// # Errors
    /// - `ResolveError` if the alert id does not name a valid target
    fn resolve(&self, alert_id: &str) -> Result<Target, ResolveError>;
}

/// Resolver for `<namespace>/<workload>` alert ids
#[derive(Debug, Clone)]
pub struct DelimitedResolver {
    default_namespace: String,
}

impl DelimitedResolver {
    /// Create resolver with the namespace used for bare workload ids
    #[inline]
    #[must_use]
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
        }
    }
}

impl Default for DelimitedResolver {
    fn default() -> Self {
        Self::new(crate::types::DEFAULT_NAMESPACE)
    }
}

impl TargetResolver for DelimitedResolver {
    fn resolve(&self, alert_id: &str) -> Result<Target, ResolveError> {
        let alert_id = alert_id.trim();
        if alert_id.is_empty() {
            return Err(ResolveError::Empty);
        }

        let (namespace, workload) = match alert_id.split_once('/') {
            Some((_, rest)) if rest.contains('/') => {
                return Err(ResolveError::TooManySegments(alert_id.to_owned()))
            }
            Some((namespace, workload)) => (namespace, workload),
            None => (self.default_namespace.as_str(), alert_id),
        };

        if !is_dns_label(namespace) {
            return Err(ResolveError::InvalidNamespace(namespace.to_owned()));
        }
        if !is_dns_label(workload) {
            return Err(ResolveError::InvalidWorkload(workload.to_owned()));
        }
        Ok(Target::new(namespace, workload))
    }
}
