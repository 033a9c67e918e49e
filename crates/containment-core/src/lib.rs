//! Containment core (containment-core)
//!
//! Turns containment intents into remediation:
//! 1. **Gating**: confidence threshold, then human approval for live actions
//! 2. **Dispatch**: a closed action set mapped onto an executor capability
//! 3. **Reporting**: monotonic status writes under optimistic concurrency
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use containment_core::prelude::*;
//!
//! let store = Arc::new(InMemoryIntentStore::new());
//! let reconciler = Reconciler::new(store.clone(), executor, ReconcilerConfig::default());
//!
//! let report = reconciler.reconcile(&id, &Cancellation::none()).await?;
//! if let Some(delay) = report.requeue_after() {
//!     queue.add_after(id, delay);
//! }
//! ```

pub mod action;
pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod policy;
pub mod reconciler;
pub mod state_machine;
pub mod status;
pub mod store;
pub mod target;
pub mod types;

// Re-exports
pub use error::*;
pub use types::*;

/// Commonly used types
pub mod prelude {
    pub use crate::action::{ActionRequest, SuggestedAction};
    pub use crate::cancel::{Cancellation, Interrupted};
    pub use crate::config::ReconcilerConfig;
    pub use crate::error::{ExecutorError, ExecutorErrorKind, ReconcileError, StoreError};
    pub use crate::executor::ActionExecutor;
    pub use crate::policy::{DeferReason, GateDecision, GatingPolicy};
    pub use crate::reconciler::{Outcome, ReconcileAction, ReconcileReport, Reconciler};
    pub use crate::status::{Clock, SystemClock};
    pub use crate::store::{InMemoryIntentStore, IntentStore};
    pub use crate::target::{DelimitedResolver, Target, TargetResolver};
    pub use crate::types::{
        Confidence, ContainmentIntent, ContainmentSpec, ContainmentStatus, IntentId, IntentState,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
