//! Reconciler configuration

use crate::error::ConfigError;
use crate::target::is_dns_label;
use crate::types::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for gating, retry and target resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Minimum confidence required to act
    pub confidence_threshold: f64,
    /// Redelivery delay while awaiting approval
    pub approval_requeue_secs: u64,
    /// Optional redelivery delay for low-confidence intents
    ///
    /// `None` keeps them pending until an external update re-triggers
    /// reconciliation.
    pub low_confidence_recheck_secs: Option<u64>,
    /// Total executor attempts for retryable failures
    pub max_executor_attempts: u32,
    /// Redelivery delay after a retryable executor failure
    pub retry_backoff_secs: u64,
    /// Namespace for alert ids that name only a workload
    pub default_namespace: String,
}

impl ReconcilerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With confidence threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// With low-confidence recheck
    #[inline]
    #[must_use]
    pub fn with_low_confidence_recheck(mut self, secs: u64) -> Self {
        self.low_confidence_recheck_secs = Some(secs);
        self
    }

    /// With retry policy for retryable executor failures
    #[inline]
    #[must_use]
    pub fn with_executor_retry(mut self, max_attempts: u32, backoff_secs: u64) -> Self {
        self.max_executor_attempts = max_attempts;
        self.retry_backoff_secs = backoff_secs;
        self
    }

    /// With default namespace
    #[inline]
    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Approval redelivery delay
    #[inline]
    #[must_use]
    pub fn approval_requeue(&self) -> Duration {
        Duration::from_secs(self.approval_requeue_secs)
    }

    /// Low-confidence redelivery delay, if enabled
    #[inline]
    #[must_use]
    pub fn low_confidence_recheck(&self) -> Option<Duration> {
        self.low_confidence_recheck_secs.map(Duration::from_secs)
    }

    /// Executor retry delay
    #[inline]
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// Validate ranges
    ///
    /// # Errors
    /// - `ConfigError` naming the first invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidThreshold(self.confidence_threshold));
        }
        if self.approval_requeue_secs == 0 {
            return Err(ConfigError::ZeroDuration("approval_requeue_secs"));
        }
        if self.low_confidence_recheck_secs == Some(0) {
            return Err(ConfigError::ZeroDuration("low_confidence_recheck_secs"));
        }
        if self.retry_backoff_secs == 0 {
            return Err(ConfigError::ZeroDuration("retry_backoff_secs"));
        }
        if self.max_executor_attempts == 0 {
            return Err(ConfigError::ZeroCount("max_executor_attempts"));
        }
        if !is_dns_label(&self.default_namespace) {
            return Err(ConfigError::InvalidNamespace(self.default_namespace.clone()));
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            approval_requeue_secs: 30,
            low_confidence_recheck_secs: None,
            max_executor_attempts: 3,
            retry_backoff_secs: 30,
            default_namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReconcilerConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.approval_requeue(), Duration::from_secs(30));
        assert_eq!(config.low_confidence_recheck(), None);
        assert!((config.confidence_threshold - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            ReconcilerConfig::new().with_threshold(1.5).validate(),
            Err(ConfigError::InvalidThreshold(1.5))
        );
        assert_eq!(
            ReconcilerConfig::new().with_executor_retry(0, 30).validate(),
            Err(ConfigError::ZeroCount("max_executor_attempts"))
        );
        assert_eq!(
            ReconcilerConfig::new().with_low_confidence_recheck(0).validate(),
            Err(ConfigError::ZeroDuration("low_confidence_recheck_secs"))
        );
        assert!(matches!(
            ReconcilerConfig::new()
                .with_default_namespace("Not_A_Label")
                .validate(),
            Err(ConfigError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: ReconcilerConfig =
            serde_json::from_str(r#"{"confidence_threshold": 0.8}"#).unwrap();
        assert!((config.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.max_executor_attempts, 3);
        assert_eq!(config.default_namespace, "default");
    }
}
