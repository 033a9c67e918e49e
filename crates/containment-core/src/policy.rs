//! Gating policy
//!
//! Decides whether an intent may be dispatched:
//! - confidence must reach the threshold
//! - a non-dry-run intent needs an approval token
//!
//! Confidence is checked first, so a low-confidence intent is reported as
//! such whatever its action or dry-run flag.

use crate::config::ReconcilerConfig;
use crate::types::ContainmentSpec;
use std::fmt;
use std::time::Duration;

/// Why dispatch was deferred; recorded verbatim in `status.result`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferReason {
    /// Confidence below threshold
    ConfidenceTooLow,
    /// Live action without an approval token
    AwaitingApproval,
}

impl DeferReason {
    /// Reason code
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfidenceTooLow => "confidence_too_low",
            Self::AwaitingApproval => "awaiting_approval",
        }
    }
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gating verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Dispatch may proceed
    Proceed,
    /// Record pending and optionally redeliver later
    Defer {
        /// Reason code
        reason: DeferReason,
        /// Redelivery delay, if any
        requeue_after: Option<Duration>,
    },
}

/// Confidence and approval gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatingPolicy {
    confidence_threshold: f64,
    approval_requeue: Duration,
    low_confidence_recheck: Option<Duration>,
}

impl GatingPolicy {
    /// Create policy from reconciler configuration
    #[must_use]
    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            approval_requeue: config.approval_requeue(),
            low_confidence_recheck: config.low_confidence_recheck(),
        }
    }

    /// Confidence threshold
    #[inline]
    #[must_use]
    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Evaluate an intent spec
    #[must_use]
    pub fn evaluate(&self, spec: &ContainmentSpec) -> GateDecision {
        if spec.confidence.value() < self.confidence_threshold {
            return GateDecision::Defer {
                reason: DeferReason::ConfidenceTooLow,
                requeue_after: self.low_confidence_recheck,
            };
        }

        if !spec.dry_run && !spec.has_approval() {
            return GateDecision::Defer {
                reason: DeferReason::AwaitingApproval,
                requeue_after: Some(self.approval_requeue),
            };
        }

        GateDecision::Proceed
    }
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self::from_config(&ReconcilerConfig::default())
    }
}
