//! Intent status lifecycle: unreconciled, `pending`, then `applied` or `failed`

use crate::error::TransitionError;
use crate::types::IntentState;

/// Validates a status transition.
///
/// `from` is `None` for an intent that has never been reconciled. Terminal
/// states admit no transition, including a rewrite of the same state.
pub fn validate_transition(
    from: Option<IntentState>,
    to: IntentState,
) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// States reachable from `from` in one status write
#[must_use]
pub fn allowed_transitions(from: Option<IntentState>) -> &'static [IntentState] {
    use IntentState::{Applied, Failed, Pending};
    match from {
        None | Some(Pending) => &[Pending, Applied, Failed],
        Some(Applied | Failed) => &[],
    }
}
