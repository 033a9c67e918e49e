//! Action dispatch
//!
//! Maps a suggested action to the matching executor call. Dry-run never
//! touches the executor.

use crate::action::SuggestedAction;
use crate::error::ExecutorError;
use crate::executor::ActionExecutor;
use crate::target::Target;
use std::sync::Arc;

/// Routes actions to an executor
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn ActionExecutor>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create dispatcher over an executor
    #[inline]
    #[must_use]
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self { executor }
    }

    /// Dispatch `action` against `target`
    ///
    /// # Returns
    /// The applied action name, suffixed `_dryrun` when simulating
    ///
    /// # Errors
    /// - The executor's error, verbatim
    pub async fn dispatch(
        &self,
        action: SuggestedAction,
        target: &Target,
        dry_run: bool,
    ) -> Result<String, ExecutorError> {
        if dry_run {
            tracing::info!(%action, %target, "dry run: would apply containment action");
            return Ok(action.applied_name(true));
        }

        match action {
            SuggestedAction::IsolateNetwork => self.executor.isolate(target).await?,
            SuggestedAction::EvictWorkload => self.executor.evict(target).await?,
            SuggestedAction::BlackholeTraffic => self.executor.blackhole(target).await?,
        }
        Ok(action.applied_name(false))
    }
}
