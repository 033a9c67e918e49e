//! Error types for the containment core
//!
//! Provides error handling for:
//! - Boundary validation (unknown actions, confidence range, intent ids)
//! - Target resolution
//! - Executor failures, classified as terminal or retryable
//! - Intent store access and optimistic-concurrency conflicts
//! - Reconcile-level failures that the host must redeliver

use crate::cancel::Interrupted;
use crate::types::{IntentId, IntentState};

/// Suggested action outside the closed action set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0:?}")]
pub struct UnknownAction(pub String);

/// Confidence value outside `[0, 1]` or not finite
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("confidence {0} is outside [0, 1]")]
pub struct InvalidConfidence(pub f64);

/// Malformed `namespace/name` intent identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid intent id {0:?}: expected <namespace>/<name> or <name>")]
pub struct ParseIntentIdError(pub String);

/// Illegal status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition {from:?} -> {to:?}")]
pub struct TransitionError {
    /// State currently recorded (`None` for an intent never reconciled)
    pub from: Option<IntentState>,
    /// Requested state
    pub to: IntentState,
}

/// Alert id could not be resolved to a target
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Alert id is empty
    #[error("alert id is empty")]
    Empty,

    /// More than one `/` separator
    #[error("alert id {0:?} has too many segments")]
    TooManySegments(String),

    /// Namespace part is not a DNS-1123 label
    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),

    /// Workload part is not a DNS-1123 label
    #[error("invalid workload {0:?}")]
    InvalidWorkload(String),
}

/// Executor failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorErrorKind {
    /// Permanent; the intent is recorded as failed
    Terminal,
    /// Transient; the call may be attempted again
    Retryable,
}

/// Failure reported by an action executor
///
/// Displays as the bare message so the recorded result reads
/// `error: <message>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutorError {
    /// Classification
    pub kind: ExecutorErrorKind,
    /// Human-readable cause
    pub message: String,
}

impl ExecutorError {
    /// Create a terminal executor error
    #[inline]
    #[must_use]
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            kind: ExecutorErrorKind::Terminal,
            message: message.into(),
        }
    }

    /// Create a retryable executor error
    #[inline]
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: ExecutorErrorKind::Retryable,
            message: message.into(),
        }
    }

    /// Resource created by a previous action already exists
    #[inline]
    #[must_use]
    pub fn already_exists(what: impl std::fmt::Display) -> Self {
        Self::terminal(format!("{what} already exists"))
    }

    /// Check if the call may be attempted again
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == ExecutorErrorKind::Retryable
    }
}

/// Intent store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Write was based on a stale resource version
    #[error("conflict writing {id}: expected version {expected}, found {found}")]
    Conflict {
        /// Intent being written
        id: IntentId,
        /// Version the writer observed
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// Intent does not exist
    #[error("intent {0} not found")]
    NotFound(IntentId),

    /// Stored document could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(String),

    /// Backend failure (I/O, connectivity)
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Reconciler configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Threshold outside `[0, 1]`
    #[error("confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    /// A duration that must be positive is zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// A count that must be positive is zero
    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),

    /// Default namespace is not a DNS-1123 label
    #[error("invalid default namespace {0:?}")]
    InvalidNamespace(String),
}

/// Errors surfaced by a reconcile invocation
///
/// Everything else the loop decides is recorded in the intent's status;
/// these are the outcomes the host must redeliver.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Cancellation signal fired mid-call
    #[error("reconcile cancelled")]
    Cancelled,

    /// Deadline elapsed mid-call
    #[error("reconcile deadline exceeded")]
    DeadlineExceeded,

    /// Status write lost an optimistic-concurrency race
    #[error("status conflict on {id}: expected version {expected}, found {found}")]
    Conflict {
        /// Intent being written
        id: IntentId,
        /// Version the reconcile observed
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// Store failure other than a conflict
    #[error("store error: {0}")]
    Store(StoreError),

    /// Status write would break state monotonicity
    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
}

impl ReconcileError {
    /// Check if the error came from cancellation or a deadline
    #[inline]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Check if the host should redeliver the intent
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::DeadlineExceeded
                | Self::Conflict { .. }
                | Self::Store(StoreError::Backend(_))
        )
    }
}

impl From<StoreError> for ReconcileError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict {
                id,
                expected,
                found,
            } => Self::Conflict {
                id,
                expected,
                found,
            },
            other => Self::Store(other),
        }
    }
}

impl From<Interrupted> for ReconcileError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}
