//! Action executor capability
//!
//! Executors perform the actual remediation against the cluster. The core
//! only calls them; each call must be safe to issue concurrently for
//! different targets.

use crate::error::ExecutorError;
use crate::target::Target;
use std::time::Duration;

/// Grace period granted to an evicted workload
pub const EVICTION_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Remediation primitives
///
/// Implement this trait to realise containment against a concrete
/// networking/compute layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Install a deny-all ingress and egress policy scoped to the target
    ///
    /// Re-isolating the same target surfaces as an `already exists` error.
    async fn isolate(&self, target: &Target) -> Result<(), ExecutorError>;

    /// Gracefully terminate the target with [`EVICTION_GRACE_PERIOD`]
    async fn evict(&self, target: &Target) -> Result<(), ExecutorError>;

    /// Reroute or drop traffic to and from the target
    async fn blackhole(&self, target: &Target) -> Result<(), ExecutorError>;
}
