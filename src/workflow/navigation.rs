//! Navigation Guard
//!
//! The wizard is strictly linear. Going back (or staying) is always
//! allowed; going forward requires the current step to be completed.

use super::model::{StepId, StepStates, StepStatus};

/// Returns true if the wizard may move from `current` to `target`.
pub fn can_advance(current: StepId, target: StepId, steps: &StepStates) -> bool {
    if target.index() <= current.index() {
        return true;
    }
    steps.get(current).status == StepStatus::Completed
}

/// Returns true if there is a next step and it may be entered.
pub fn can_go_next(current: StepId, steps: &StepStates) -> bool {
    current
        .next()
        .is_some_and(|next| can_advance(current, next, steps))
}

/// Returns true if there is a previous step.
pub fn can_go_previous(current: StepId) -> bool {
    current.previous().is_some()
}
